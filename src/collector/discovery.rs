//! Input device discovery through sysfs.

use std::path::{Path, PathBuf};

const SYS_INPUT: &str = "/sys/class/input";
const DEV_INPUT: &str = "/dev/input";

/// An `eventN` node and the name the driver reports for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub path: PathBuf,
    pub name: String,
}

/// List all evdev nodes on this system.
pub fn list_input_devices() -> Vec<InputDeviceInfo> {
    list_input_devices_in(Path::new(SYS_INPUT), Path::new(DEV_INPUT))
}

/// Device nodes whose name contains `name_match` (case-insensitive).
pub fn discover_devices(name_match: &str) -> Vec<PathBuf> {
    filter_by_name(list_input_devices(), name_match)
}

/// List `eventN` entries under `sys_root`, mapping them to nodes in `dev_root`.
pub fn list_input_devices_in(sys_root: &Path, dev_root: &Path) -> Vec<InputDeviceInfo> {
    let mut devices: Vec<InputDeviceInfo> = std::fs::read_dir(sys_root)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with("event"))
                .map(|e| {
                    let name = std::fs::read_to_string(e.path().join("device").join("name"))
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default();
                    InputDeviceInfo {
                        path: dev_root.join(e.file_name()),
                        name,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    devices.sort_by_key(|d| event_index(&d.path));
    devices
}

/// Keep devices whose name contains `name_match`, ignoring case.
pub fn filter_by_name(devices: Vec<InputDeviceInfo>, name_match: &str) -> Vec<PathBuf> {
    let wanted = name_match.to_lowercase();
    devices
        .into_iter()
        .filter(|d| d.name.to_lowercase().contains(&wanted))
        .map(|d| d.path)
        .collect()
}

fn event_index(path: &Path) -> u32 {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("event"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_node(sys: &Path, node: &str, name: &str) {
        let dir = sys.join(node).join("device");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("name"), format!("{name}\n")).unwrap();
    }

    #[test]
    fn test_list_sorted_by_index() {
        let sys = tempfile::tempdir().unwrap();
        fake_node(sys.path(), "event10", "gpio-keys");
        fake_node(sys.path(), "event2", "apds990x proximity");
        fake_node(sys.path(), "mouse0", "ignored");

        let devices = list_input_devices_in(sys.path(), Path::new("/dev/input"));
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].path, PathBuf::from("/dev/input/event2"));
        assert_eq!(devices[0].name, "apds990x proximity");
        assert_eq!(devices[1].path, PathBuf::from("/dev/input/event10"));
    }

    #[test]
    fn test_filter_by_name_ignores_case() {
        let devices = vec![
            InputDeviceInfo {
                path: PathBuf::from("/dev/input/event1"),
                name: "Proximity Sensor".into(),
            },
            InputDeviceInfo {
                path: PathBuf::from("/dev/input/event3"),
                name: "Touchscreen".into(),
            },
        ];

        assert_eq!(
            filter_by_name(devices, "proximity"),
            vec![PathBuf::from("/dev/input/event1")]
        );
    }

    #[test]
    fn test_missing_sysfs_is_empty() {
        let devices = list_input_devices_in(Path::new("/nonexistent/sys"), Path::new("/dev/input"));
        assert!(devices.is_empty());
    }
}
