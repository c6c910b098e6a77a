use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use obs_clock::{Clock, SessionSchedule};
use obs_schemas::{Snapshot, TriggerCard};

/// Append-only JSONL writer with session-date rotation.
///
/// Owned exclusively by the logger thread; no other writer touches the
/// file handle.
pub struct TriggerCardWriter {
    dir: PathBuf,
    run_id: String,
    flush_every: u32,

    seq: u64,
    unflushed: u32,
    current: Option<OpenFile>,
}

struct OpenFile {
    session_date: String,
    file: File,
}

impl TriggerCardWriter {
    /// Create the writer and ensure the log directory exists.
    pub fn new(dir: impl AsRef<Path>, run_id: &str, flush_every: u32) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("create_dir_all {:?}", dir))?;
        Ok(Self {
            dir,
            run_id: run_id.to_string(),
            flush_every: flush_every.max(1),
            seq: 0,
            unflushed: 0,
            current: None,
        })
    }

    /// Cards emitted so far (monotonic per run, from 1).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Log file path for a compact session date (`YYYYMMDD`).
    pub fn path_for(&self, session_date: &str) -> PathBuf {
        self.dir
            .join(format!("triggercard_{}_{}.jsonl", session_date, self.run_id))
    }

    /// Append one card referencing `snapshot`. Rotates first when the
    /// local session date moved since the previous emit.
    pub fn emit(&mut self, snapshot: &Snapshot, clock: &dyn Clock) -> Result<()> {
        let session_date = session_date_compact(clock);
        self.rotate_if_needed(&session_date)?;

        self.seq += 1;
        let card = TriggerCard::from_snapshot(
            snapshot,
            self.seq,
            clock.now_unix_ms(),
            clock.now_mono_ns(),
        );

        // One write call per record: a crash can truncate at most the
        // line currently being written.
        let mut line = serde_json::to_string(&card).context("serialize trigger card")?;
        line.push('\n');

        let open = self
            .current
            .as_mut()
            .expect("rotate_if_needed always leaves a file open");
        open.file
            .write_all(line.as_bytes())
            .context("append trigger card line")?;

        self.unflushed += 1;
        if self.unflushed >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    /// Force buffered records to disk.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(open) = self.current.as_mut() {
            open.file.sync_data().context("sync trigger log")?;
        }
        self.unflushed = 0;
        Ok(())
    }

    fn rotate_if_needed(&mut self, session_date: &str) -> Result<()> {
        let needs_rotation = self
            .current
            .as_ref()
            .map(|open| open.session_date != session_date)
            .unwrap_or(true);
        if !needs_rotation {
            return Ok(());
        }

        if self.current.is_some() {
            self.flush()?;
        }

        let path = self.path_for(session_date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open trigger log {:?}", path))?;
        self.current = Some(OpenFile {
            session_date: session_date.to_string(),
            file,
        });
        Ok(())
    }
}

impl Drop for TriggerCardWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Local session date as `YYYYMMDD` (rolls at 17:00 local).
fn session_date_compact(clock: &dyn Clock) -> String {
    SessionSchedule::session_date(clock.now_local())
        .format("%Y%m%d")
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use obs_clock::FrozenClock;
    use obs_schemas::{
        Controls, FeedState, GateMetrics, GateReport, Instrument, Intent, LoopHealth, MdMode,
        ReasonCode, SessionPhase, SessionState, SNAPSHOT_SCHEMA_VERSION,
    };

    fn snapshot(snapshot_id: u64) -> Snapshot {
        Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            app_version: "0.4.0".to_string(),
            config_hash: "hash".to_string(),
            run_id: "run-w".to_string(),
            run_start_ts_unix_ms: 0,
            snapshot_id,
            cycle_count: snapshot_id,
            ts_unix_ms: snapshot_id as i64,
            ts_mono_ns: snapshot_id,
            instrument: Instrument {
                symbol: "MNQ".to_string(),
                contract_key: "MNQ.202603".to_string(),
                con_id: Some(42),
                tick_size: 0.25,
            },
            feed: FeedState::default(),
            quote: None,
            session: SessionState {
                in_operating_window: true,
                is_break_window: false,
                session_phase: SessionPhase::Operating,
                session_date_iso: "2026-03-02".to_string(),
            },
            controls: Controls {
                intent: Intent::Long,
                arm: false,
                last_cmd_id: 0,
                last_cmd_ts_unix_ms: None,
            },
            loop_health: LoopHealth {
                cycle_ms: 1.0,
                cycle_overrun: false,
                engine_degraded: false,
                last_cycle_start_mono_ns: 0,
            },
            gates: GateReport {
                allowed: false,
                reason_codes: vec![ReasonCode::ArmOff],
                gate_metrics: GateMetrics {
                    staleness_ms: Some(10),
                    spread_ticks: Some(1),
                    md_mode: MdMode::Realtime,
                    connected: true,
                    in_operating_window: true,
                    is_break_window: false,
                    engine_degraded: false,
                    cycle_ms: Some(1.0),
                },
            },
            last_any_event_mono_ns: None,
            last_quote_event_mono_ns: None,
            quotes_received_count: 0,
            ready: false,
            ready_reasons: vec![ReasonCode::ArmOff],
        }
    }

    fn read_cards(path: &Path) -> Vec<TriggerCard> {
        let raw = fs::read_to_string(path).unwrap();
        raw.lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    #[test]
    fn seq_is_monotonic_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FrozenClock::at_local(2026, 3, 2, 10, 0, 0);
        let mut writer = TriggerCardWriter::new(dir.path(), "run-w", 10).unwrap();

        for id in 1..=5 {
            writer.emit(&snapshot(id), &clock).unwrap();
        }
        writer.flush().unwrap();

        let cards = read_cards(&writer.path_for("20260302"));
        assert_eq!(cards.len(), 5);
        for (i, card) in cards.iter().enumerate() {
            assert_eq!(card.seq, i as u64 + 1);
            assert_eq!(card.schema_version, "triggercard.v1");
            assert_eq!(card.action_taken, "NONE");
        }
    }

    #[test]
    fn filename_uses_session_date_and_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FrozenClock::at_local(2026, 3, 2, 10, 0, 0);
        let mut writer = TriggerCardWriter::new(dir.path(), "abc123", 1).unwrap();
        writer.emit(&snapshot(1), &clock).unwrap();

        let expected = dir.path().join("triggercard_20260302_abc123.jsonl");
        assert!(expected.exists());
    }

    #[test]
    fn rotates_when_the_session_date_rolls_at_seventeen() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FrozenClock::at_local(2026, 3, 2, 16, 59, 0);
        let mut writer = TriggerCardWriter::new(dir.path(), "run-w", 1).unwrap();

        writer.emit(&snapshot(1), &clock).unwrap();
        // Cross 17:00 local: session date becomes tomorrow.
        clock.advance_ms(2 * 60 * 1000);
        writer.emit(&snapshot(2), &clock).unwrap();

        let before = read_cards(&writer.path_for("20260302"));
        let after = read_cards(&writer.path_for("20260303"));
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 1);
        // seq keeps counting across the rotation.
        assert_eq!(after[0].seq, 2);
    }

    #[test]
    fn truncated_tail_still_yields_all_complete_records() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FrozenClock::at_local(2026, 3, 2, 10, 0, 0);
        let mut writer = TriggerCardWriter::new(dir.path(), "run-w", 1).unwrap();
        for id in 1..=3 {
            writer.emit(&snapshot(id), &clock).unwrap();
        }
        let path = writer.path_for("20260302");
        drop(writer);

        // Simulate a crash mid-write: a partial record with no newline.
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"{\"schema_version\":\"triggercard.v1\",\"run").unwrap();
        drop(f);

        let cards = read_cards(&path);
        assert_eq!(cards.len(), 3);
        assert_eq!(cards.last().unwrap().seq, 3);
    }

    #[test]
    fn every_line_parses_independently() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FrozenClock::at_local(2026, 3, 2, 10, 0, 0);
        let mut writer = TriggerCardWriter::new(dir.path(), "run-w", 2).unwrap();
        for id in 1..=4 {
            writer.emit(&snapshot(id), &clock).unwrap();
        }
        writer.flush().unwrap();

        let raw = fs::read_to_string(writer.path_for("20260302")).unwrap();
        assert!(raw.ends_with('\n'));
        for line in raw.lines() {
            let card: TriggerCard = serde_json::from_str(line).unwrap();
            assert_eq!(card.run_id, "run-w");
            assert_eq!(card.reason_codes, vec![ReasonCode::ArmOff]);
        }
    }
}
