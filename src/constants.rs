/// A fixed 4-byte request frame: three content bytes followed by their checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Symbolic name used in log output.
    pub name: &'static str,
    /// The bytes put on the wire, checksum included.
    pub bytes: [u8; 4],
}

impl Command {
    const fn new(name: &'static str, bytes: [u8; 4]) -> Self {
        Command { name, bytes }
    }
}

// SW_RESET restarts the sensor's internal state. Its reply is indeterminate.
pub const SW_RESET: Command = Command::new("SW_RESET", [0xB4, 0x00, 0x20, 0x98]);

// READ_WHOAMI requests the component identity register.
pub const READ_WHOAMI: Command = Command::new("READ_WHOAMI", [0x40, 0x00, 0x00, 0x91]);

// Accelerometer output registers, one per axis.
pub const READ_ACC_X: Command = Command::new("READ_ACC_X", [0x04, 0x00, 0x00, 0xF7]);
pub const READ_ACC_Y: Command = Command::new("READ_ACC_Y", [0x08, 0x00, 0x00, 0xFD]);
pub const READ_ACC_Z: Command = Command::new("READ_ACC_Z", [0x0C, 0x00, 0x00, 0xFB]);

// READ_STO requests the self-test output, reported as the auxiliary status.
pub const READ_STO: Command = Command::new("READ_STO", [0x10, 0x00, 0x00, 0xE9]);

// READ_TEMPERATURE requests the raw temperature counter.
pub const READ_TEMPERATURE: Command =
    Command::new("READ_TEMPERATURE", [0x14, 0x00, 0x00, 0xEF]);

// Measurement mode selection (datasheet table "operation modes").
pub const CHANGE_TO_MODE_1: Command = Command::new("CHANGE_TO_MODE_1", [0xB4, 0x00, 0x00, 0x1F]);
pub const CHANGE_TO_MODE_2: Command = Command::new("CHANGE_TO_MODE_2", [0xB4, 0x00, 0x01, 0x02]);
pub const CHANGE_TO_MODE_3: Command = Command::new("CHANGE_TO_MODE_3", [0xB4, 0x00, 0x02, 0x25]);
pub const CHANGE_TO_MODE_4: Command = Command::new("CHANGE_TO_MODE_4", [0xB4, 0x00, 0x03, 0x38]);

// READ_STATUS_SUMMARY is also the filler command sent while collecting a reply.
pub const READ_STATUS_SUMMARY: Command =
    Command::new("READ_STATUS_SUMMARY", [0x18, 0x00, 0x00, 0xE5]);

// Register addresses as they appear in the header byte of a reply frame.
pub const ACC_X: u8 = 0x01;
pub const ACC_Y: u8 = 0x02;
pub const ACC_Z: u8 = 0x03;
pub const STO: u8 = 0x04;
pub const TEMP: u8 = 0x05;
pub const STATUS: u8 = 0x06;
pub const MODE: u8 = 0x0D;
pub const WHOAMI: u8 = 0x10;
pub const SELBANK: u8 = 0x1F;

// WHOAMI_VALUE is the second payload byte of a WHOAMI reply from an SCL3300.
pub const WHOAMI_VALUE: u8 = 0xC1;

/// Returns the datasheet name of a register address, if it is one we know.
pub fn register_name(address: u8) -> Option<&'static str> {
    match address {
        ACC_X => Some("ACC_X"),
        ACC_Y => Some("ACC_Y"),
        ACC_Z => Some("ACC_Z"),
        STO => Some("STO"),
        TEMP => Some("TEMP"),
        STATUS => Some("STATUS"),
        MODE => Some("MODE"),
        WHOAMI => Some("WHOAMI"),
        SELBANK => Some("SELBANK"),
        _ => None,
    }
}
