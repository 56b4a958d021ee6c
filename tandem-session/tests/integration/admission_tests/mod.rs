pub mod test_concurrent_joins;
pub mod test_join_missing_room;
pub mod test_room_capacity;
