use anyhow::Result;

use crate::audio::source::list_devices;

/// Print available input and output audio devices, mirroring the reference
/// `list_audio_devices` diagnostic.
pub fn list_audio_devices() -> Result<()> {
    println!("Input devices:");
    for (name, is_default) in list_devices(true)? {
        let marker = if is_default { " (default)" } else { "" };
        println!("  {}{}", name, marker);
    }

    println!("Output devices:");
    for (name, is_default) in list_devices(false)? {
        let marker = if is_default { " (default)" } else { "" };
        println!("  {}{}", name, marker);
    }

    Ok(())
}
