use serde::{Deserialize, Serialize};

use crate::paths::SourceResolver;

/// Page background choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Background {
    Color(String),
    Image(String),
}

impl Background {
    /// CSS `background` shorthand the UI applies to the page body.
    pub fn style(&self, resolver: &SourceResolver) -> String {
        match self {
            Background::Color(c) => c.clone(),
            Background::Image(src) => {
                format!("url('{}') center/cover no-repeat", resolver.resolve_image(src))
            }
        }
    }
}
