//! Windows back-end: SetupAPI over the monitor device class.

use super::DeviceBackend;
use crate::error::{ChimeError, Result};
use windows::core::{GUID, PCWSTR};
use windows::Win32::Devices::DeviceAndDriverInstallation::{
    SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInfo, SetupDiGetClassDevsW,
    SetupDiGetDeviceInstanceIdW, DIGCF_PRESENT, GUID_DEVCLASS_MONITOR, HDEVINFO,
    SP_DEVINFO_DATA,
};
use windows::Win32::Foundation::{ERROR_NO_MORE_ITEMS, HWND};

/// Longest device instance id SetupAPI hands out (MAX_DEVICE_ID_LEN + NUL)
const INSTANCE_ID_CAPACITY: usize = 201;

/// Present monitors, as reported by SetupAPI
pub struct SetupApiBackend;

/// Owned device information set, destroyed on drop
struct DeviceInfoList(HDEVINFO);

impl Drop for DeviceInfoList {
    fn drop(&mut self) {
        unsafe {
            let _ = SetupDiDestroyDeviceInfoList(self.0);
        }
    }
}

impl DeviceBackend for SetupApiBackend {
    fn instance_paths(&mut self) -> Result<Vec<String>> {
        let list = unsafe {
            SetupDiGetClassDevsW(
                Some(&GUID_DEVCLASS_MONITOR as *const GUID),
                PCWSTR::null(),
                HWND::default(),
                DIGCF_PRESENT,
            )
        }
        .map(DeviceInfoList)
        .map_err(|e| ChimeError::Enumeration(format!("SetupDiGetClassDevsW: {}", e)))?;

        let mut paths = Vec::new();
        for index in 0u32.. {
            let mut info = SP_DEVINFO_DATA {
                cbSize: std::mem::size_of::<SP_DEVINFO_DATA>() as u32,
                ..Default::default()
            };

            if let Err(e) = unsafe { SetupDiEnumDeviceInfo(list.0, index, &mut info) } {
                if e.code() == ERROR_NO_MORE_ITEMS.to_hresult() {
                    break;
                }
                return Err(ChimeError::Enumeration(format!(
                    "SetupDiEnumDeviceInfo({}): {}",
                    index, e
                )));
            }

            let mut buffer = [0u16; INSTANCE_ID_CAPACITY];
            unsafe { SetupDiGetDeviceInstanceIdW(list.0, &info, Some(&mut buffer[..]), None) }
                .map_err(|e| {
                    ChimeError::Enumeration(format!("SetupDiGetDeviceInstanceIdW: {}", e))
                })?;

            let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
            paths.push(String::from_utf16_lossy(&buffer[..len]));
        }

        Ok(paths)
    }
}
