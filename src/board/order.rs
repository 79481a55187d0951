use super::registry::Registry;
use crate::store::{self, KvStore, OrderRecord};

pub fn save<S: KvStore + ?Sized>(store: &mut S, ids: Vec<String>) {
    store::save(store, &OrderRecord(ids));
}

pub fn restore<S: KvStore + ?Sized>(store: &S) -> Vec<String> {
    store::load::<OrderRecord, _>(store).0
}

/// Moves every known id to the end in list order. Unknown ids are skipped;
/// buttons the list does not mention stay in front in their current order.
pub fn apply(registry: &mut Registry, ids: &[String]) {
    for id in ids {
        registry.move_to_end(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::button::SoundButton;
    use crate::store::MemoryStore;

    fn board(sources: &[&str]) -> Registry {
        let mut r = Registry::new();
        for s in sources {
            r.register(SoundButton::builtin(*s, *s, None));
        }
        r
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn round_trip_reproduces_order() {
        let mut store = MemoryStore::new();
        save(&mut store, ids(&["b_3", "b_1", "b_2"]));

        let mut r = board(&["1", "2", "3"]);
        apply(&mut r, &restore(&store));
        assert_eq!(r.ids(), ids(&["b_3", "b_1", "b_2"]));
    }

    #[test]
    fn missing_ids_are_skipped() {
        let mut store = MemoryStore::new();
        save(&mut store, ids(&["b_3", "b_1", "b_2"]));

        let mut r = board(&["1", "3"]);
        apply(&mut r, &restore(&store));
        assert_eq!(r.ids(), ids(&["b_3", "b_1"]));
    }

    #[test]
    fn nothing_saved_keeps_registration_order() {
        let store = MemoryStore::new().with("order", "garbage");
        let mut r = board(&["1", "2"]);
        apply(&mut r, &restore(&store));
        assert_eq!(r.ids(), ids(&["b_1", "b_2"]));
    }
}
