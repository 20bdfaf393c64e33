use embedded_sdmmc::{Error, Mode, SdCard, SdCardError, TimeSource, VolumeIdx, VolumeManager};
use log::error;

use geiger_core::settings::SETTINGS_MAX_BYTES;
use geiger_core::{Settings, SettingsError, SettingsStore};

const SETTINGS_FILE: &str = "SETTINGS.BIN";

/// [`SettingsStore`] backed by a file in the root of the SD card.
///
/// Operations are blocking, like the display writes sharing the same task.
pub struct SdSettingsStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
}

impl<S, D, T> SdSettingsStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(sd_card, ts),
        }
    }

    fn read_file(&self, buf: &mut [u8]) -> Result<Option<usize>, Error<SdCardError>> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        let file = match root_dir.open_file_in_dir(SETTINGS_FILE, Mode::ReadOnly) {
            Ok(file) => file,
            Err(Error::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut used = 0;
        while used < buf.len() {
            let read = file.read(&mut buf[used..])?;
            if read == 0 {
                break;
            }
            used += read;
        }

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(Some(used))
    }

    fn write_file(&self, data: &[u8]) -> Result<(), Error<SdCardError>> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(SETTINGS_FILE, Mode::ReadWriteCreateOrTruncate)?;

        file.write(data)?;

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }
}

impl<S, D, T> SettingsStore for SdSettingsStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    fn load(&mut self) -> Result<Option<Settings>, SettingsError> {
        let mut buf = [0u8; SETTINGS_MAX_BYTES];
        match self.read_file(&mut buf) {
            Ok(Some(len)) => Settings::from_bytes(&buf[..len]).map(Some),
            Ok(None) => Ok(None),
            Err(e) => {
                error!("Failed to read {}: {:?}", SETTINGS_FILE, e);
                Err(SettingsError::Storage("SD card read failed"))
            }
        }
    }

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        let mut buf = [0u8; SETTINGS_MAX_BYTES];
        let encoded = settings.to_bytes(&mut buf)?;
        self.write_file(encoded).map_err(|e| {
            error!("Failed to write {}: {:?}", SETTINGS_FILE, e);
            SettingsError::Storage("SD card write failed")
        })
    }
}

/// Clock for FAT timestamps. The device has no RTC, so files carry a
/// fixed date.
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> embedded_sdmmc::Timestamp {
        embedded_sdmmc::Timestamp {
            year_since_1970: 55,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}
