//! Startup listing of every device and its last known fix.

use std::io::{self, Write};

use waypost_types::{Device, DeviceLocationSample, sanitize_label};

use crate::source::LocationSource;

/// Print each device's last known location to `out`.
///
/// Devices without a fix print only the blank separator line. Returns the
/// number of devices that had a location.
pub async fn write_device_report<S, W>(
    out: &mut W,
    source: &S,
    devices: &[Device],
) -> io::Result<usize>
where
    S: LocationSource,
    W: Write,
{
    let mut located = 0;
    for device in devices {
        if let Some(sample) = source.device_location(&device.id).await {
            write_device_block(out, device, &sample)?;
            located += 1;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(located)
}

fn write_device_block<W: Write>(
    out: &mut W,
    device: &Device,
    sample: &DeviceLocationSample,
) -> io::Result<()> {
    let coordinate = sample.coordinate();
    writeln!(
        out,
        "Device: {} - {}",
        sanitize_label(&device.display_name),
        sanitize_label(device.id.as_str())
    )?;
    writeln!(out, "Latitude: {}", coordinate.latitude())?;
    writeln!(out, "Longitude: {}", coordinate.longitude())?;
    writeln!(out, "Date: {}", sample.observed_at_display())
}
