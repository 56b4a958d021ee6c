pub mod test_switch_device;
pub mod test_switch_unknown_device;
