use serde::{Deserialize, Serialize};

/// An installed Windows service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    /// Image path of the service binary
    pub filename: String,
    pub user: String,
    pub dll: String,
    pub service_type: String,
    pub start_type: String,
    pub error_control: String,
    pub computer: String,
    pub evidence: Vec<String>,
}

impl Service {
    pub fn same_service(&self, other: &Service) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.filename.eq_ignore_ascii_case(&other.filename)
            && self.computer == other.computer
    }
}

const SERVICE_TYPE_FLAGS: [(i64, &str); 7] = [
    (0x1, "KernelDriver"),
    (0x2, "FileSystemDriver"),
    (0x4, "Adapter"),
    (0x8, "RecognizerDriver"),
    (0x10, "Win32OwnProcess"),
    (0x20, "Win32ShareProcess"),
    (0x100, "InteractiveProcess"),
];

/// Name of a `Type` registry value; combined flags are joined with `|`
pub fn service_type_name(code: i64) -> String {
    if code == 0 {
        return String::new();
    }
    let names: Vec<&str> = SERVICE_TYPE_FLAGS
        .iter()
        .filter(|(flag, _)| code & flag != 0)
        .map(|(_, name)| *name)
        .collect();
    let known = SERVICE_TYPE_FLAGS.iter().fold(0, |acc, (flag, _)| acc | flag);
    if names.is_empty() || code & !known != 0 {
        return format!("0x{:x}", code);
    }
    names.join("|")
}

pub fn start_type_name(code: i64) -> String {
    match code {
        0 => "Boot",
        1 => "System",
        2 => "Automatic",
        3 => "Manual",
        4 => "Disabled",
        other => return other.to_string(),
    }
    .to_string()
}

pub fn error_control_name(code: i64) -> String {
    match code {
        0 => "Ignore",
        1 => "Normal",
        2 => "Severe",
        3 => "Critical",
        other => return other.to_string(),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_names() {
        assert_eq!(service_type_name(16), "Win32OwnProcess");
        assert_eq!(service_type_name(1), "KernelDriver");
        assert_eq!(service_type_name(0x110), "Win32OwnProcess|InteractiveProcess");
        assert_eq!(service_type_name(0x40), "0x40");
        assert_eq!(service_type_name(0), "");
    }

    #[test]
    fn test_start_and_error_control() {
        assert_eq!(start_type_name(2), "Automatic");
        assert_eq!(start_type_name(3), "Manual");
        assert_eq!(start_type_name(9), "9");
        assert_eq!(error_control_name(1), "Normal");
        assert_eq!(error_control_name(3), "Critical");
    }
}
