#[cfg(test)]
mod tests {
    use crate::storage::memory::{MemoryStore, Store};

    #[test]
    fn test_set_get_round_trip() {
        let store = MemoryStore::new();
        store.set(0x40, b"hello".to_vec()).unwrap();
        assert_eq!(store.get(0x40).unwrap(), b"hello".to_vec());
    }

    #[test]
    fn test_absent_key_reads_as_empty() {
        let store = MemoryStore::new();
        assert!(store.get(0x99).unwrap().is_empty());
        assert!(!store.contains(0x99));
    }

    #[test]
    fn test_last_writer_wins() {
        let store = MemoryStore::new();
        store.set(0x40, b"first".to_vec()).unwrap();
        store.set(0x40, b"second".to_vec()).unwrap();
        assert_eq!(store.get(0x40).unwrap(), b"second".to_vec());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_all_snapshots_every_entry() {
        let store = MemoryStore::new();
        for key in 0u64..100 {
            store.set(key, key.to_be_bytes().to_vec()).unwrap();
        }

        let snapshot = store.all().unwrap();
        assert_eq!(snapshot.len(), 100);
        for key in 0u64..100 {
            assert_eq!(snapshot[&key], key.to_be_bytes().to_vec());
        }
    }

    #[test]
    fn test_constrain_keeps_only_the_owned_arc() {
        let store = MemoryStore::new();
        for key in [0x05u64, 0x10, 0x11, 0x40, 0x80, 0x81] {
            store.set(key, vec![1]).unwrap();
        }

        // new predecessor at 0x10, our id 0x80: we own (0x10, 0x80]
        store.constrain(0x10, 0x80).unwrap();

        assert!(!store.contains(0x05));
        assert!(!store.contains(0x10), "the left endpoint moves away");
        assert!(store.contains(0x11));
        assert!(store.contains(0x40));
        assert!(store.contains(0x80), "our own id stays");
        assert!(!store.contains(0x81));
    }

    #[test]
    fn test_constrain_wraparound_arc() {
        let store = MemoryStore::new();
        for key in [0x05u64, 0x10, 0x40, 0x80, 0xF0, u64::MAX] {
            store.set(key, vec![1]).unwrap();
        }

        // predecessor at 0x80, our id 0x10: the arc wraps through zero
        store.constrain(0x80, 0x10).unwrap();

        assert!(store.contains(0xF0));
        assert!(store.contains(u64::MAX));
        assert!(store.contains(0x05));
        assert!(store.contains(0x10));
        assert!(!store.contains(0x40));
        assert!(!store.contains(0x80));
    }

    #[test]
    fn test_constrain_to_self_retains_everything() {
        let store = MemoryStore::new();
        for key in [0x0u64, 0x10, 0xDEAD_BEEF, u64::MAX] {
            store.set(key, vec![1]).unwrap();
        }

        // sole member of the ring: nothing may be dropped
        store.constrain(0x10, 0x10).unwrap();
        assert_eq!(store.len(), 4);
    }
}
