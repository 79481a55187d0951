//! Sound and image identifier resolution.
//!
//! Embedded payloads (`data:`) and network references (`http...`) pass through
//! untouched. Everything else is treated as a path inside a fixed directory.

#[derive(Debug, Clone)]
pub struct SourceResolver {
    sound_dir: String,
    image_dir: String,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new("sounds/", "images/")
    }
}

fn passthrough(id: &str) -> bool {
    id.is_empty() || id.starts_with("data:") || id.starts_with("http")
}

fn with_slash(dir: &str) -> String {
    let trimmed = dir.trim_start_matches('/');
    if trimmed.ends_with('/') { trimmed.to_string() } else { format!("{trimmed}/") }
}

impl SourceResolver {
    pub fn new(sound_dir: &str, image_dir: &str) -> Self {
        Self { sound_dir: with_slash(sound_dir), image_dir: with_slash(image_dir) }
    }

    pub fn resolve_sound(&self, id: &str) -> String {
        if passthrough(id) {
            return id.to_string();
        }
        let p = id.trim_start_matches('/');
        if p.starts_with(&self.sound_dir) { p.to_string() } else { format!("{}{}", self.sound_dir, p) }
    }

    pub fn resolve_image(&self, id: &str) -> String {
        if passthrough(id) {
            return id.to_string();
        }
        let mut p = id.trim_start_matches('/');
        // "../../images/x.png" -> "images/x.png"
        let mut rest = p;
        while let Some(r) = rest.strip_prefix("../") {
            rest = r;
        }
        if rest.len() != p.len() && rest.starts_with(&self.image_dir) {
            p = rest;
        }
        if p.starts_with(&self.image_dir) { p.to_string() } else { format!("{}{}", self.image_dir, p) }
    }

    /// True when the resolved identifier is an embedded payload rather than a path.
    pub fn is_embedded(id: &str) -> bool {
        id.starts_with("data:")
    }

    pub fn is_remote(id: &str) -> bool {
        id.starts_with("http")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_paths() {
        let r = SourceResolver::default();
        assert_eq!(r.resolve_sound("airhorn.mp3"), "sounds/airhorn.mp3");
        assert_eq!(r.resolve_sound("//airhorn.mp3"), "sounds/airhorn.mp3");
        assert_eq!(r.resolve_sound("/sounds/airhorn.mp3"), "sounds/airhorn.mp3");
        assert_eq!(r.resolve_sound("data:audio/wav;base64,AAAA"), "data:audio/wav;base64,AAAA");
        assert_eq!(r.resolve_sound("https://cdn.example/a.mp3"), "https://cdn.example/a.mp3");
        assert_eq!(r.resolve_sound(""), "");
    }

    #[test]
    fn image_paths_collapse_parent_traversal() {
        let r = SourceResolver::default();
        assert_eq!(r.resolve_image("../images/bg.png"), "images/bg.png");
        assert_eq!(r.resolve_image("../../images/bg.png"), "images/bg.png");
        assert_eq!(r.resolve_image("/bg.png"), "images/bg.png");
        assert_eq!(r.resolve_image("images/bg.png"), "images/bg.png");
        // traversal that does not land in the image dir is left for the prefix rule
        assert_eq!(r.resolve_image("../other/bg.png"), "images/../other/bg.png");
    }

    #[test]
    fn custom_dirs_get_trailing_slash() {
        let r = SourceResolver::new("/clips", "art/");
        assert_eq!(r.resolve_sound("a.wav"), "clips/a.wav");
        assert_eq!(r.resolve_image("x.jpg"), "art/x.jpg");
    }
}
