//! # Input Records
//!
//! Loads the two simulator inputs: the operating-system parameter record and
//! the job records.
//!
//! ## Formats
//!
//! Files ending in `.json` are read with `serde_json` (a [`SimConfig`] and a
//! list of [`JobDescription`]). Anything else is the legacy fixed-layout
//! binary format, all integers little-endian `i32`:
//!
//! ```text
//! parameters (52 bytes)
//!   memory model (0 none, 1 fixed, 2 variable), fixed block size,
//!   fixed block count, variable max size, variable total size,
//!   max tasks, quantum, disk units, tape units, CD-ROM units,
//!   print every N units, algorithm name (8 bytes, NUL padded)
//!
//! job (136 bytes, repeated to end of file)
//!   priority, memory size, 10 x (cpu units, io units, device code),
//!   name (8 bytes, NUL padded)
//! ```
//!
//! Unused cycle slots are all zero and are dropped on load.

use core_types::{Cycle, DeviceClass, JobDescription, MAX_CYCLES};
use resources::{DeviceUnits, MemoryConfig};
use sim_kernel::{Algorithm, SimConfig, DEFAULT_RUNAWAY_LIMIT};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Size of a legacy parameter record
pub const PARAMS_RECORD_LEN: usize = 52;

/// Size of a legacy job record
pub const JOB_RECORD_LEN: usize = 136;

const NAME_LEN: usize = 8;

/// Record loading error types
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parameter record is {len} bytes, expected {expected}")]
    TruncatedParams { len: usize, expected: usize },

    #[error("Job record {index} is truncated ({len} trailing bytes)")]
    TruncatedJob { index: usize, len: usize },

    #[error("Unknown memory model: {0}")]
    UnknownMemoryModel(i32),

    #[error("Unknown scheduling algorithm: '{0}'")]
    UnknownAlgorithm(String),

    #[error("Field '{field}' must not be negative (got {value})")]
    NegativeField { field: &'static str, value: i32 },

    #[error("Job '{job}' cycle {cycle} has unknown device code {code}")]
    UnknownDeviceCode { job: String, cycle: usize, code: i32 },
}

/// Little-endian `i32` reader over a fixed record
struct Fields<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Fields<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn int(&mut self) -> i32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[self.offset..self.offset + 4]);
        self.offset += 4;
        i32::from_le_bytes(raw)
    }

    fn unsigned(&mut self, field: &'static str) -> Result<u32, RecordError> {
        let value = self.int();
        u32::try_from(value).map_err(|_| RecordError::NegativeField { field, value })
    }

    fn name(&mut self) -> String {
        let raw = &self.bytes[self.offset..self.offset + NAME_LEN];
        self.offset += NAME_LEN;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&raw[..end]).trim().to_string()
    }
}

/// Decodes a legacy parameter record
pub fn decode_params(bytes: &[u8]) -> Result<SimConfig, RecordError> {
    if bytes.len() < PARAMS_RECORD_LEN {
        return Err(RecordError::TruncatedParams {
            len: bytes.len(),
            expected: PARAMS_RECORD_LEN,
        });
    }
    let mut fields = Fields::new(&bytes[..PARAMS_RECORD_LEN]);

    let model = fields.int();
    let block_size = fields.unsigned("fixed block size")?;
    let total_blocks = fields.unsigned("fixed block count")?;
    let max_size = fields.unsigned("variable max size")?;
    let total_size = fields.unsigned("variable total size")?;
    let memory = match model {
        0 => MemoryConfig::None,
        1 => MemoryConfig::Fixed {
            block_size: u64::from(block_size),
            total_blocks,
        },
        2 => MemoryConfig::Variable {
            max_size: u64::from(max_size),
            total_size: u64::from(total_size),
        },
        other => return Err(RecordError::UnknownMemoryModel(other)),
    };

    let max_processes = fields.unsigned("max tasks")? as usize;
    let quantum = fields.unsigned("quantum")?;
    let devices = DeviceUnits::new(
        fields.unsigned("disk units")?,
        fields.unsigned("tape units")?,
        fields.unsigned("cdrom units")?,
    );
    let report_interval = fields.unsigned("every n units")?;
    let name = fields.name();
    let algorithm: Algorithm = name
        .parse()
        .map_err(|_| RecordError::UnknownAlgorithm(name.clone()))?;

    Ok(SimConfig {
        memory,
        max_processes,
        quantum: u64::from(quantum),
        devices,
        report_interval: u64::from(report_interval),
        algorithm,
        runaway_limit: DEFAULT_RUNAWAY_LIMIT,
    })
}

/// Decodes every job record in `bytes`
pub fn decode_jobs(bytes: &[u8]) -> Result<Vec<JobDescription>, RecordError> {
    let records = bytes.chunks(JOB_RECORD_LEN);
    let mut jobs = Vec::with_capacity(records.len());
    for (index, record) in records.enumerate() {
        if record.len() < JOB_RECORD_LEN {
            return Err(RecordError::TruncatedJob {
                index,
                len: record.len(),
            });
        }
        jobs.push(decode_job(record)?);
    }
    Ok(jobs)
}

fn decode_job(record: &[u8]) -> Result<JobDescription, RecordError> {
    let mut fields = Fields::new(record);
    let priority = fields.int();
    let memsize = fields.unsigned("memory size")?;

    let mut slots = [[0i32; 3]; MAX_CYCLES];
    for slot in slots.iter_mut() {
        for value in slot.iter_mut() {
            *value = fields.int();
        }
    }
    let name = fields.name();

    let mut cycles = Vec::new();
    for (cycle, [cpu, io, code]) in slots.into_iter().enumerate() {
        if cpu == 0 && io == 0 && code == 0 {
            continue;
        }
        let cpu_units = u32::try_from(cpu).map_err(|_| RecordError::NegativeField {
            field: "cpu units",
            value: cpu,
        })?;
        let io_units = u32::try_from(io).map_err(|_| RecordError::NegativeField {
            field: "io units",
            value: io,
        })?;
        let device = if io_units > 0 {
            let class = DeviceClass::from_code(code).ok_or_else(|| RecordError::UnknownDeviceCode {
                job: name.clone(),
                cycle,
                code,
            })?;
            Some(class)
        } else {
            None
        };
        cycles.push(Cycle {
            cpu_units,
            io_units,
            device,
        });
    }

    Ok(JobDescription::new(name, priority, u64::from(memsize), cycles))
}

/// Encodes a parameter record in the legacy layout
///
/// Values wider than the record's `i32` fields are saturated.
pub fn encode_params(config: &SimConfig) -> Vec<u8> {
    let (model, block_size, total_blocks, max_size, total_size) = match config.memory {
        MemoryConfig::None => (0, 0, 0, 0, 0),
        MemoryConfig::Fixed {
            block_size,
            total_blocks,
        } => (1, block_size, u64::from(total_blocks), 0, 0),
        MemoryConfig::Variable {
            max_size,
            total_size,
        } => (2, 0, 0, max_size, total_size),
    };

    let mut bytes = Vec::with_capacity(PARAMS_RECORD_LEN);
    let ints = [
        model,
        block_size,
        total_blocks,
        max_size,
        total_size,
        config.max_processes as u64,
        config.quantum,
        u64::from(config.devices.disk),
        u64::from(config.devices.tape),
        u64::from(config.devices.cdrom),
        config.report_interval,
    ];
    for value in ints {
        push_int(&mut bytes, value);
    }
    push_name(&mut bytes, &config.algorithm.to_string());
    bytes
}

/// Encodes a job record in the legacy layout
pub fn encode_job(job: &JobDescription) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(JOB_RECORD_LEN);
    bytes.extend_from_slice(&job.priority.to_le_bytes());
    push_int(&mut bytes, job.memsize);
    for slot in 0..MAX_CYCLES {
        let (cpu, io, code) = match job.cycles.get(slot) {
            Some(cycle) => (
                u64::from(cycle.cpu_units),
                u64::from(cycle.io_units),
                cycle.device.map(|d| d.code()).unwrap_or(0),
            ),
            None => (0, 0, 0),
        };
        push_int(&mut bytes, cpu);
        push_int(&mut bytes, io);
        bytes.extend_from_slice(&code.to_le_bytes());
    }
    push_name(&mut bytes, &job.name);
    bytes
}

fn push_int(bytes: &mut Vec<u8>, value: u64) {
    let value = i32::try_from(value).unwrap_or(i32::MAX);
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn push_name(bytes: &mut Vec<u8>, name: &str) {
    let mut raw = [0u8; NAME_LEN];
    // Keep the last byte as the terminator
    for (slot, byte) in raw.iter_mut().zip(name.bytes().take(NAME_LEN - 1)) {
        *slot = byte;
    }
    bytes.extend_from_slice(&raw);
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read(path: &Path) -> Result<Vec<u8>, RecordError> {
    fs::read(path).map_err(|source| RecordError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Loads the parameter file at `path`
pub fn load_params(path: &Path) -> Result<SimConfig, RecordError> {
    let bytes = read(path)?;
    if is_json(path) {
        Ok(serde_json::from_slice(&bytes)?)
    } else {
        decode_params(&bytes)
    }
}

/// Loads the job file at `path`
///
/// All-zero cycles are dropped whatever the format.
pub fn load_jobs(path: &Path) -> Result<Vec<JobDescription>, RecordError> {
    let bytes = read(path)?;
    if is_json(path) {
        let mut jobs: Vec<JobDescription> = serde_json::from_slice(&bytes)?;
        for job in &mut jobs {
            job.cycles.retain(|cycle| !cycle.is_empty());
        }
        Ok(jobs)
    } else {
        decode_jobs(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn legacy_config() -> SimConfig {
        SimConfig::default()
            .with_algorithm(Algorithm::Mlfq)
            .with_quantum(5)
            .with_max_processes(6)
            .with_report_interval(20)
            .with_devices(DeviceUnits::new(3, 1, 2))
            .with_memory(MemoryConfig::Fixed {
                block_size: 64,
                total_blocks: 16,
            })
    }

    fn editor() -> JobDescription {
        JobDescription::new(
            "editor",
            -2,
            300,
            vec![
                Cycle::with_io(3, 2, DeviceClass::Disk),
                Cycle::cpu(4),
                Cycle::with_io(1, 6, DeviceClass::Cdrom),
            ],
        )
    }

    #[test]
    fn test_params_record_layout() {
        let bytes = encode_params(&legacy_config());
        assert_eq!(bytes.len(), PARAMS_RECORD_LEN);
        assert_eq!(&bytes[0..4], &1i32.to_le_bytes());
        assert_eq!(&bytes[44..48], b"MLFQ");
        assert_eq!(decode_params(&bytes).unwrap(), legacy_config());
    }

    #[test]
    fn test_variable_and_unmodeled_memory() {
        let config = legacy_config().with_memory(MemoryConfig::Variable {
            max_size: 400,
            total_size: 1000,
        });
        assert_eq!(decode_params(&encode_params(&config)).unwrap(), config);

        let config = legacy_config().with_memory(MemoryConfig::None);
        assert_eq!(decode_params(&encode_params(&config)).unwrap(), config);
    }

    #[test]
    fn test_params_errors() {
        assert!(matches!(
            decode_params(&[0u8; 20]),
            Err(RecordError::TruncatedParams { len: 20, .. })
        ));

        let mut bytes = encode_params(&legacy_config());
        bytes[0..4].copy_from_slice(&7i32.to_le_bytes());
        assert!(matches!(
            decode_params(&bytes),
            Err(RecordError::UnknownMemoryModel(7))
        ));

        let mut bytes = encode_params(&legacy_config());
        bytes[44..52].copy_from_slice(b"SJF\0\0\0\0\0");
        assert!(matches!(
            decode_params(&bytes),
            Err(RecordError::UnknownAlgorithm(name)) if name == "SJF"
        ));

        let mut bytes = encode_params(&legacy_config());
        bytes[24..28].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            decode_params(&bytes),
            Err(RecordError::NegativeField { field: "quantum", value: -1 })
        ));
    }

    #[test]
    fn test_job_record_layout() {
        let bytes = encode_job(&editor());
        assert_eq!(bytes.len(), JOB_RECORD_LEN);
        assert_eq!(&bytes[128..134], b"editor");

        let jobs = decode_jobs(&bytes).unwrap();
        assert_eq!(jobs, vec![editor()]);
    }

    #[test]
    fn test_empty_cycle_slots_dropped() {
        let mut bytes = encode_job(&editor());
        // Move the third cycle into the last slot, leaving gaps
        let third = 8 + 2 * 12;
        let last = 8 + 9 * 12;
        let cycle: Vec<u8> = bytes[third..third + 12].to_vec();
        bytes[last..last + 12].copy_from_slice(&cycle);
        bytes[third..third + 12].fill(0);

        let job = &decode_jobs(&bytes).unwrap()[0];
        assert_eq!(job.cycles.len(), 3);
        assert_eq!(job.cycles[2], Cycle::with_io(1, 6, DeviceClass::Cdrom));
    }

    #[test]
    fn test_cpu_only_cycle_ignores_device_code() {
        let mut bytes = encode_job(&JobDescription::new("calc", 1, 10, vec![Cycle::cpu(4)]));
        // io = 0, device code 9
        bytes[16..20].copy_from_slice(&9i32.to_le_bytes());
        let job = &decode_jobs(&bytes).unwrap()[0];
        assert_eq!(job.cycles, vec![Cycle::cpu(4)]);
    }

    #[test]
    fn test_unknown_device_code() {
        let mut bytes = encode_job(&editor());
        bytes[16..20].copy_from_slice(&4i32.to_le_bytes());
        assert!(matches!(
            decode_jobs(&bytes),
            Err(RecordError::UnknownDeviceCode { cycle: 0, code: 4, .. })
        ));
    }

    #[test]
    fn test_truncated_job_file() {
        let mut bytes = encode_job(&editor());
        bytes.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            decode_jobs(&bytes),
            Err(RecordError::TruncatedJob { index: 1, len: 3 })
        ));
    }

    #[test]
    fn test_long_names_truncated_to_record() {
        let job = JobDescription::new("spreadsheet", 1, 10, vec![Cycle::cpu(1)]);
        let decoded = decode_jobs(&encode_job(&job)).unwrap();
        assert_eq!(decoded[0].name, "spreads");
    }

    #[test]
    fn test_load_legacy_files() {
        let mut params = NamedTempFile::new().unwrap();
        params.write_all(&encode_params(&legacy_config())).unwrap();

        let mut jobs = NamedTempFile::new().unwrap();
        jobs.write_all(&encode_job(&editor())).unwrap();
        jobs.write_all(&encode_job(&JobDescription::new(
            "calc",
            3,
            20,
            vec![Cycle::cpu(2)],
        )))
        .unwrap();

        assert_eq!(load_params(params.path()).unwrap(), legacy_config());
        let loaded = load_jobs(jobs.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].name, "calc");
    }

    #[test]
    fn test_load_json_files() {
        let mut params = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        params
            .write_all(serde_json::to_string(&legacy_config()).unwrap().as_bytes())
            .unwrap();

        let mut jobs = tempfile::Builder::new().suffix(".JSON").tempfile().unwrap();
        jobs.write_all(
            br#"[{"name": "io", "priority": 1, "memsize": 5,
                  "cycles": [{"cpu": 2, "io": 1, "device": "tape"}, {"cpu": 0}]}]"#,
        )
        .unwrap();

        assert_eq!(load_params(params.path()).unwrap(), legacy_config());
        let loaded = load_jobs(jobs.path()).unwrap();
        assert_eq!(loaded[0].cycles, vec![Cycle::with_io(2, 1, DeviceClass::Tape)]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("OS_INP.DAT");
        assert!(matches!(load_jobs(&missing), Err(RecordError::Io { .. })));
    }
}
