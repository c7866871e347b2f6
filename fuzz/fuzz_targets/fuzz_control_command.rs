//! Fuzz target: console line parser
//!
//! Feeds arbitrary UTF-8 lines to `ControlCommand::from_str`.
//!
//! Invariants checked:
//! - No panics under any input
//! - Blank lines are always `Empty`
//! - `Arm` carries a non-empty, trimmed argument
//! - `ZoneAdd` names are non-empty and trimmed; `Logs` asks for at least one line
//!
//! cargo fuzz run fuzz_control_command

#![no_main]

use libfuzzer_sys::fuzz_target;
use minder::app::commands::{CommandParseError, ControlCommand};

fuzz_target!(|data: &[u8]| {
    let Ok(line) = core::str::from_utf8(data) else {
        return;
    };

    match line.parse::<ControlCommand>() {
        Ok(ControlCommand::Arm(name)) => {
            assert!(!name.is_empty());
            assert_eq!(name, name.trim());
        }
        Ok(ControlCommand::ZoneAdd { name, .. }) => {
            assert!(!name.is_empty());
            assert_eq!(name, name.trim());
        }
        Ok(ControlCommand::Logs { lines }) => assert!(lines > 0),
        Ok(_) => assert!(!line.trim().is_empty()),
        Err(e) => {
            if line.trim().is_empty() {
                assert_eq!(e, CommandParseError::Empty);
            }
            let _ = e.to_string();
        }
    }
});
