pub mod read_hold;
pub mod set_hold;
pub mod write_modbus;
