//! Protocol constants for the CrystalFontz packet interface

/// Highest operation id understood by any supported module (CFA-635 `Read GPIO Pin`)
pub const MAX_COMMAND: u8 = 35;

/// Largest payload carried by one packet (column, row and a full 20-column run)
pub const MAX_DATA_LENGTH: usize = 22;

/// Command + length + CRC
pub const PACKET_OVERHEAD: usize = 4;

/// Largest encoded packet on the wire
pub const MAX_PACKET_SIZE: usize = MAX_DATA_LENGTH + PACKET_OVERHEAD;

/// Operation ids (low six bits of the command byte)
pub mod cmd {
    pub const PING: u8 = 0;
    pub const GET_VERSION: u8 = 1;
    pub const WRITE_FLASH: u8 = 2;
    pub const READ_FLASH: u8 = 3;
    pub const STORE_BOOT_STATE: u8 = 4;
    pub const REBOOT: u8 = 5;
    pub const CLEAR_SCREEN: u8 = 6;
    pub const SET_LINE_1: u8 = 7;
    pub const SET_LINE_2: u8 = 8;
    pub const SET_SPECIAL_CHAR: u8 = 9;
    pub const READ_LCD_MEMORY: u8 = 10;
    pub const SET_CURSOR_POSITION: u8 = 11;
    pub const SET_CURSOR_STYLE: u8 = 12;
    pub const SET_CONTRAST: u8 = 13;
    pub const SET_BACKLIGHT: u8 = 14;
    pub const READ_FANS: u8 = 15;
    pub const SET_FAN_REPORTING: u8 = 16;
    pub const SET_FAN_POWER: u8 = 17;
    pub const READ_DOW_INFO: u8 = 18;
    pub const SET_TEMP_REPORTING: u8 = 19;
    pub const DOW_TRANSACTION: u8 = 20;
    pub const SET_LIVE_DISPLAY: u8 = 21;
    pub const DIRECT_LCD_COMMAND: u8 = 22;
    pub const SET_KEY_EVENT_REPORTING: u8 = 23;
    pub const READ_KEYPAD_POLLED: u8 = 24;
    pub const SET_FAN_FAILSAFE: u8 = 25;
    pub const SET_FAN_TACH_GLITCH: u8 = 26;
    pub const QUERY_FAN_FAILSAFE: u8 = 27;
    pub const SET_ATX_SWITCH: u8 = 28;
    pub const WATCHDOG: u8 = 29;
    pub const READ_REPORTING_STATE: u8 = 30;
    pub const SEND_DATA: u8 = 31;
    pub const KEY_LEGENDS: u8 = 32;
    pub const SET_BAUD_RATE: u8 = 33;
    pub const SET_GPIO: u8 = 34;
    pub const READ_GPIO: u8 = 35;

    /// Human-readable name of an operation id (type tag ignored)
    pub fn name(cmd: u8) -> &'static str {
        match cmd & super::tag::OPERATION_MASK {
            PING => "PING",
            GET_VERSION => "GET_VERSION",
            WRITE_FLASH => "WRITE_FLASH",
            READ_FLASH => "READ_FLASH",
            STORE_BOOT_STATE => "STORE_BOOT_STATE",
            REBOOT => "REBOOT",
            CLEAR_SCREEN => "CLEAR_SCREEN",
            SET_LINE_1 => "SET_LINE_1",
            SET_LINE_2 => "SET_LINE_2",
            SET_SPECIAL_CHAR => "SET_SPECIAL_CHAR",
            READ_LCD_MEMORY => "READ_LCD_MEMORY",
            SET_CURSOR_POSITION => "SET_CURSOR_POSITION",
            SET_CURSOR_STYLE => "SET_CURSOR_STYLE",
            SET_CONTRAST => "SET_CONTRAST",
            SET_BACKLIGHT => "SET_BACKLIGHT",
            READ_FANS => "READ_FANS",
            SET_FAN_REPORTING => "SET_FAN_REPORTING",
            SET_FAN_POWER => "SET_FAN_POWER",
            READ_DOW_INFO => "READ_DOW_INFO",
            SET_TEMP_REPORTING => "SET_TEMP_REPORTING",
            DOW_TRANSACTION => "DOW_TRANSACTION",
            SET_LIVE_DISPLAY => "SET_LIVE_DISPLAY",
            DIRECT_LCD_COMMAND => "DIRECT_LCD_COMMAND",
            SET_KEY_EVENT_REPORTING => "SET_KEY_EVENT_REPORTING",
            READ_KEYPAD_POLLED => "READ_KEYPAD_POLLED",
            SET_FAN_FAILSAFE => "SET_FAN_FAILSAFE",
            SET_FAN_TACH_GLITCH => "SET_FAN_TACH_GLITCH",
            QUERY_FAN_FAILSAFE => "QUERY_FAN_FAILSAFE",
            SET_ATX_SWITCH => "SET_ATX_SWITCH",
            WATCHDOG => "WATCHDOG",
            READ_REPORTING_STATE => "READ_REPORTING_STATE",
            SEND_DATA => "SEND_DATA",
            KEY_LEGENDS => "KEY_LEGENDS",
            SET_BAUD_RATE => "SET_BAUD_RATE",
            SET_GPIO => "SET_GPIO",
            READ_GPIO => "READ_GPIO",
            _ => "UNKNOWN",
        }
    }
}

/// Type tags carried in the top two bits of the command byte
pub mod tag {
    pub const MASK: u8 = 0xC0;
    pub const OPERATION_MASK: u8 = 0x3F;

    /// Host to device request
    pub const REQUEST: u8 = 0x00;
    /// Device acknowledgement of a request
    pub const ACK: u8 = 0x40;
    /// Unsolicited report (key activity, fan, temperature)
    pub const REPORT: u8 = 0x80;
    /// Device error reply to a request
    pub const ERROR: u8 = 0xC0;

    /// Key activity report: `0x80 | 0`
    pub const KEY_ACTIVITY: u8 = REPORT;
    pub const FAN_REPORT: u8 = REPORT | 1;
    pub const TEMPERATURE_REPORT: u8 = REPORT | 2;

    pub fn name(command: u8) -> &'static str {
        match command & MASK {
            REQUEST => "REQ",
            ACK => "ACK",
            REPORT => "RPT",
            _ => "ERR",
        }
    }
}

/// Raw key activity codes reported in `data[0]` of a key packet
pub mod key {
    pub const UP_PRESS: u8 = 1;
    pub const DOWN_PRESS: u8 = 2;
    pub const LEFT_PRESS: u8 = 3;
    pub const RIGHT_PRESS: u8 = 4;
    pub const ENTER_PRESS: u8 = 5;
    pub const EXIT_PRESS: u8 = 6;
    pub const UP_RELEASE: u8 = 7;
    pub const DOWN_RELEASE: u8 = 8;
    pub const LEFT_RELEASE: u8 = 9;
    pub const RIGHT_RELEASE: u8 = 10;
    pub const ENTER_RELEASE: u8 = 11;
    pub const EXIT_RELEASE: u8 = 12;
    // CFA-631 corner keys
    pub const UL_PRESS: u8 = 13;
    pub const UR_PRESS: u8 = 14;
    pub const LL_PRESS: u8 = 15;
    pub const LR_PRESS: u8 = 16;
    pub const UL_RELEASE: u8 = 17;
    pub const UR_RELEASE: u8 = 18;
    pub const LL_RELEASE: u8 = 19;
    pub const LR_RELEASE: u8 = 20;

    pub fn is_release(code: u8) -> bool {
        (UP_RELEASE..=EXIT_RELEASE).contains(&code) || (UL_RELEASE..=LR_RELEASE).contains(&code)
    }
}

/// Payload the module expects with the reboot command
pub const REBOOT_MAGIC: [u8; 3] = [8, 18, 99];

/// Response wait timing
pub mod timing {
    /// Total time to wait for the acknowledgement of one command (ms)
    pub const RESPONSE_TIMEOUT_MS: u64 = 250;
    /// Time one receive attempt may block on the link (µs)
    pub const POLL_INTERVAL_US: u64 = 250;
    /// Time the module needs to come back after a reboot (ms)
    pub const REBOOT_DELAY_MS: u64 = 2000;
}

/// Supported serial line speeds
pub const BAUD_RATES: [u32; 5] = [1200, 2400, 9600, 19200, 115200];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_ignores_type_tag() {
        assert_eq!(cmd::name(cmd::SET_CONTRAST), "SET_CONTRAST");
        assert_eq!(cmd::name(tag::ACK | cmd::SET_CONTRAST), "SET_CONTRAST");
        assert_eq!(cmd::name(cmd::KEY_LEGENDS), "KEY_LEGENDS");
        assert_eq!(cmd::name(36), "UNKNOWN");
    }

    #[test]
    fn test_every_operation_has_a_name() {
        for id in 0..=MAX_COMMAND {
            assert_ne!(cmd::name(id), "UNKNOWN", "operation {id}");
        }
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(tag::name(0x0D), "REQ");
        assert_eq!(tag::name(0x4D), "ACK");
        assert_eq!(tag::name(tag::KEY_ACTIVITY), "RPT");
        assert_eq!(tag::name(0xCD), "ERR");
    }

    #[test]
    fn test_release_codes() {
        assert!(!key::is_release(key::EXIT_PRESS));
        assert!(key::is_release(key::UP_RELEASE));
        assert!(key::is_release(key::LR_RELEASE));
        assert!(!key::is_release(key::UL_PRESS));
    }

    #[test]
    fn test_largest_row_update_fits() {
        assert!(2 + 20 <= MAX_DATA_LENGTH);
        assert_eq!(MAX_PACKET_SIZE, 26);
    }
}
