use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use jiff::Zoned;
use serde::Serialize;
use tracing::{debug, info, warn};

use maglog_core::{DeviceId, SensorRecord};

use crate::sheet::{DayReport, SheetClient};

const SUMMARY_LOG: &str = "summary";
const EVENT_LOG: &str = "events";
const LOG_EXT: &str = "log";

/// Current wall-clock time as fractional unix seconds.
pub fn now_seconds() -> f64 {
    jiff::Timestamp::now().as_millisecond() as f64 / 1000.0
}

/// The rollover boundary: a noon crossing observed between two checks.
pub fn crossed_noon(prev: &Zoned, now: &Zoned) -> bool {
    prev.hour() < 12 && now.hour() >= 12
}

/// One reconciled summary row for a device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryEntry {
    /// Device tick converted to local wall-clock seconds.
    pub local_ts: f64,
    /// Device tick in milliseconds.
    pub ticks: u32,
    pub count: u16,
    pub temperature: f64,
    pub light: f64,
}

/// The (local wall clock, device clock) pair anchoring tick conversion.
/// Both sides are stored in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeAnchor {
    pub local: f64,
    pub device: f64,
}

impl TimeAnchor {
    fn correct(&self, ticks: u32) -> f64 {
        self.local - self.device + f64::from(ticks) / 1000.0
    }
}

/// In-memory reconciled state of one device, reset at every rollover.
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub anchor: Option<TimeAnchor>,
    /// Summary rows kept in ascending device-tick order.
    pub summaries: Vec<SummaryEntry>,
    /// One backfilled local timestamp per observed sensor event.
    pub events: Vec<f64>,
}

struct Transfer {
    path: PathBuf,
    file: File,
}

/// The stateful reconciliation core of the station.
///
/// The per-day text logs are the durable record: every accepted frame is
/// appended there verbatim as it arrives. The in-memory maps exist only to
/// drive the spreadsheet export and are rebuilt from nothing each day.
pub struct EventLogger {
    data_dir: PathBuf,
    day_dir: PathBuf,
    date_label: String,
    last_check: Zoned,
    devices: BTreeMap<DeviceId, DeviceLog>,
    transfers: HashMap<DeviceId, Transfer>,
    sheets: Option<SheetClient>,
}

impl EventLogger {
    pub fn new(data_dir: impl Into<PathBuf>, sheets: Option<SheetClient>) -> io::Result<Self> {
        let mut logger = Self {
            data_dir: data_dir.into(),
            day_dir: PathBuf::new(),
            date_label: String::new(),
            last_check: Zoned::now(),
            devices: BTreeMap::new(),
            transfers: HashMap::new(),
            sheets,
        };
        logger.open_day()?;
        Ok(logger)
    }

    pub fn day_dir(&self) -> &Path {
        &self.day_dir
    }

    pub fn date_label(&self) -> &str {
        &self.date_label
    }

    pub fn device(&self, device: DeviceId) -> Option<&DeviceLog> {
        self.devices.get(&device)
    }

    /// Trigger a rollover if a noon boundary passed since the last check.
    pub async fn check_day(&mut self) -> io::Result<()> {
        let now = Zoned::now();
        let crossed = crossed_noon(&self.last_check, &now);
        self.last_check = now;
        if crossed {
            info!("noon boundary crossed, starting a new day");
            self.newday().await?;
        }
        Ok(())
    }

    /// Flush the finished day and open the next one. Archives instead of
    /// overwriting whatever a previous run left in the day directory.
    pub async fn newday(&mut self) -> io::Result<()> {
        self.save().await;
        self.devices.clear();
        self.open_day()
    }

    /// Best-effort upload of the in-memory day logs to the spreadsheet
    /// collaborator. Failures are logged and never propagate.
    pub async fn save(&mut self) {
        if self.devices.is_empty() {
            return;
        }
        let Some(sheets) = &self.sheets else {
            debug!("no spreadsheet endpoint configured, skipping upload");
            return;
        };
        let report = DayReport::build(&self.date_label, &self.devices);
        match sheets.upload(&report).await {
            Ok(()) => info!(date = %self.date_label, "day report uploaded"),
            Err(e) => warn!(error = %e, "day report upload failed"),
        }
    }

    fn open_day(&mut self) -> io::Result<()> {
        let now = Zoned::now();
        self.date_label = format!("{:02}.{:02}", now.day(), now.month());
        self.day_dir = self.data_dir.join(&self.date_label);

        if self.day_dir.exists() {
            archive_existing(&log_path(&self.day_dir, SUMMARY_LOG))?;
            archive_existing(&log_path(&self.day_dir, EVENT_LOG))?;
        } else {
            fs::create_dir_all(&self.day_dir)?;
        }
        info!(dir = %self.day_dir.display(), "day directory ready");
        Ok(())
    }

    /// Ingest a periodic summary record.
    pub fn summary(&mut self, device: DeviceId, received: f64, record: &SensorRecord) -> io::Result<()> {
        let path = log_path(&self.day_dir, SUMMARY_LOG);
        let log = self.devices.entry(device).or_default();

        let anchor = *log.anchor.get_or_insert(TimeAnchor {
            local: received,
            device: f64::from(record.ticks) / 1000.0,
        });
        let local_ts = anchor.correct(record.ticks);

        let entry = SummaryEntry {
            local_ts,
            ticks: record.ticks,
            count: record.count,
            temperature: record.temperature.value(),
            light: record.light.value(),
        };

        // the transport retries and reorders; equal ticks are re-sends,
        // earlier ticks are inserted back into place
        match log.summaries.iter().position(|e| e.ticks >= entry.ticks) {
            Some(i) if log.summaries[i].ticks == entry.ticks => {
                debug!(device = %device, ticks = entry.ticks, "duplicate summary dropped");
                return Ok(());
            }
            Some(i) => {
                debug!(device = %device, ticks = entry.ticks, position = i, "summary inserted out of order");
                log.summaries.insert(i, entry);
            }
            None => log.summaries.push(entry),
        }

        append_day_line(&path, local_ts, device, record)
    }

    /// Ingest an event notification record.
    pub fn event(&mut self, device: DeviceId, received: f64, record: &SensorRecord) -> io::Result<()> {
        let path = log_path(&self.day_dir, EVENT_LOG);
        append_day_line(&path, received, device, record)?;

        let log = self.devices.entry(device).or_default();
        let known = log.events.len();
        let target = usize::from(record.count);
        if target <= known {
            debug!(device = %device, count = record.count, known, "stale event count");
            return Ok(());
        }
        // individual events are not timestamped; everything missed since the
        // previous message is attributed to this arrival
        for _ in known..target {
            log.events.push(received);
        }
        Ok(())
    }

    /// Open a bulk transfer for a device. A conflicting open transfer is
    /// kept; the new request is only logged.
    pub fn start_file(&mut self, device: DeviceId, name: &str) -> io::Result<()> {
        if self.transfers.contains_key(&device) {
            warn!(device = %device, name, "transfer already open, keeping existing file");
            return Ok(());
        }
        // only the final path component; transfers stay inside the day dir
        let Some(file_name) = Path::new(name).file_name() else {
            warn!(device = %device, name, "unusable transfer name");
            return Ok(());
        };
        let path = self.day_dir.join(file_name);
        archive_existing(&path)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(device = %device, path = %path.display(), "transfer started");
        self.transfers.insert(device, Transfer { path, file });
        Ok(())
    }

    /// Append one raw text line to the device's open transfer.
    pub fn append_line(&mut self, device: DeviceId, text: &str) -> io::Result<()> {
        let Some(transfer) = self.transfers.get_mut(&device) else {
            warn!(device = %device, "file line with no open transfer");
            return Ok(());
        };
        transfer.file.write_all(text.as_bytes())?;
        transfer.file.write_all(b"\r\n")?;
        Ok(())
    }

    /// Close the device's open transfer.
    pub fn finish_file(&mut self, device: DeviceId) {
        match self.transfers.remove(&device) {
            Some(transfer) => {
                info!(device = %device, path = %transfer.path.display(), "transfer finished");
            }
            None => warn!(device = %device, "end of file with no open transfer"),
        }
    }
}

fn log_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{LOG_EXT}"))
}

fn append_day_line(
    path: &Path,
    local_ts: f64,
    device: DeviceId,
    record: &SensorRecord,
) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(
        file,
        "{} {} {} {} {} {}",
        local_ts,
        device,
        record.ticks,
        record.count,
        record.temperature.value(),
        record.light.value()
    )
}

/// Move a pre-existing file out of the way with a letter+counter suffix
/// (`summary.log` becomes `summary-A-00.log`), never overwriting.
pub fn archive_existing(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(LOG_EXT);
    let extension = path.extension().and_then(|s| s.to_str());
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    for letter in 'A'..='Z' {
        for counter in 0..100u32 {
            let mut name = format!("{stem}-{letter}-{counter:02}");
            if let Some(extension) = extension {
                name.push('.');
                name.push_str(extension);
            }
            let candidate = dir.join(name);
            if !candidate.exists() {
                info!(
                    from = %path.display(),
                    to = %candidate.display(),
                    "archiving previous log"
                );
                return fs::rename(path, candidate);
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free archive name",
    ))
}
