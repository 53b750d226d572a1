use crate::error::ScanError;
use serialport::SerialPortType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortEntry {
    pub name: String,
    pub description: String,
}

impl SerialPortEntry {
    pub fn new(name: String, description: String) -> Self {
        Self { name, description }
    }
}

impl std::fmt::Display for SerialPortEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.description)
        }
    }
}

/// Lists locally attached serial ports the user can hand to the serial channel
pub async fn scan_ports() -> Result<Vec<SerialPortEntry>, ScanError> {
    // Enumeration touches sysfs / the registry, keep it off the UI executor
    let ports = tokio::task::spawn_blocking(serialport::available_ports)
        .await
        .map_err(|e| ScanError::Enumerate(e.to_string()))?
        .map_err(|e| ScanError::Enumerate(e.to_string()))?;

    let entries: Vec<SerialPortEntry> = ports
        .into_iter()
        .map(|port| SerialPortEntry::new(port.port_name, describe(&port.port_type)))
        .collect();

    if entries.is_empty() {
        return Err(ScanError::NoPorts);
    }
    Ok(entries)
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::Unknown => String::new(),
    }
}
