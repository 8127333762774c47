//! Tests for candidate selection

use er_allocator::core::{
    pick_bed, pick_doctor, select_bed, select_doctor, AllocationStore, StoreTransaction,
};
use er_allocator::core::{BedRef, Doctor, DoctorLoad};
use er_allocator::infra::InMemoryStore;

fn load(doctor_id: i64, open_visits: u32) -> DoctorLoad {
    DoctorLoad {
        doctor_id,
        open_visits,
    }
}

#[test]
fn test_least_loaded_doctor_wins() {
    let loads = [load(1, 2), load(2, 0), load(3, 1)];
    assert_eq!(pick_doctor(&loads), Some(2));
}

#[test]
fn test_doctor_ties_keep_store_order() {
    let loads = [load(7, 0), load(3, 0), load(5, 0)];
    assert_eq!(pick_doctor(&loads), Some(7));
}

#[test]
fn test_no_doctor_candidates() {
    assert_eq!(pick_doctor(&[]), None);
}

#[test]
fn test_bed_ordering_by_room_then_bed() {
    let free = [BedRef::new(2, 1), BedRef::new(1, 4), BedRef::new(1, 2)];
    assert_eq!(pick_bed(&free), Some(BedRef::new(1, 2)));
    assert_eq!(pick_bed(&[]), None);
}

#[test]
fn test_selection_reads_store_without_writing() {
    let store = InMemoryStore::new();
    store.insert_doctor(Doctor {
        id: 1,
        active: true,
        available: false,
    });
    store.add_doctor(2);
    store.add_bed(BedRef::new(3, 1));
    store.add_bed(BedRef::new(2, 8));

    {
        let mut tx = store.begin().unwrap();
        assert_eq!(select_doctor(tx.as_mut()).unwrap(), Some(2));
        assert_eq!(select_bed(tx.as_mut()).unwrap(), Some(BedRef::new(2, 8)));
        tx.commit().unwrap();
    }

    assert!(store.doctor(2).unwrap().available);
    assert!(store.visits().is_empty());
}
