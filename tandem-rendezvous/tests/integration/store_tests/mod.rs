pub mod test_admission_outcomes;
pub mod test_signaling_round_trip;
pub mod test_watch_lifecycle;
