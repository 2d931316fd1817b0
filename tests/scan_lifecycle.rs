//! End-to-end coverage of `init` -> `connect` -> `scan` -> `shutdown` against
//! a hand-rolled fake transport, analogous to `original_source`'s `devplctag`
//! dev double standing in for `libplctag`.

use std::cell::Cell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use plcscan_core::config::{ConnectOptions, ScanOptions};
use plcscan_core::error::TransportError;
use plcscan_core::transport::{TagHandle, Transport};
use plcscan_core::{TagType, get_tag_type};

/// Installs a test-scoped `tracing` subscriber so `debug!`/`warn!` output
/// from the enumeration driver and scan loop surfaces under
/// `cargo test -- --nocapture`, mirroring `aero-net`'s own test setup.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fake EtherNet/IP transport keyed by tag name. `responses` backs the
/// fixed `@tags`/`@udt/<n>` pseudo-tags; `scan_values` backs the live value
/// a real tag's `read`/`get_raw_bytes` pair returns, one queued value per
/// successful scan (the last value is held once the queue drains).
#[derive(Default)]
struct MockTransport {
    responses: HashMap<String, Vec<u8>>,
    /// Names for which `create` itself fails, simulating an endpoint the
    /// controller does not expose (e.g. an unreadable `@tags`).
    unreadable: HashSet<String>,
    scan_values: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    failing: Mutex<HashSet<String>>,
    handle_names: Mutex<HashMap<TagHandle, String>>,
    next_handle: Mutex<TagHandle>,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn with_pseudo_tag(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(name.to_string(), bytes);
        self
    }

    fn with_unreadable(mut self, name: &str) -> Self {
        self.unreadable.insert(name.to_string());
        self
    }

    fn queue_scan_values(&self, name: &str, values: Vec<Vec<u8>>) {
        self.scan_values.lock().unwrap().insert(name.to_string(), values.into());
    }

    fn set_failing(&self, name: &str, fail: bool) {
        let mut set = self.failing.lock().unwrap();
        if fail {
            set.insert(name.to_string());
        } else {
            set.remove(name);
        }
    }

    fn name_of(&self, handle: TagHandle) -> String {
        self.handle_names.lock().unwrap().get(&handle).cloned().unwrap_or_default()
    }

    fn name_in(attr: &str) -> &str {
        attr.split('&').find_map(|kv| kv.strip_prefix("name=")).unwrap_or("")
    }
}

impl Transport for MockTransport {
    fn create(&self, attr_string: &str, _timeout_ms: u32) -> Result<TagHandle, TransportError> {
        let name = Self::name_in(attr_string).to_string();
        if self.unreadable.contains(&name) {
            return Err(TransportError::from("no such endpoint on the controller"));
        }
        let mut next = self.next_handle.lock().unwrap();
        *next += 1;
        let handle = *next;
        self.handle_names.lock().unwrap().insert(handle, name);
        Ok(handle)
    }

    fn read(&self, handle: TagHandle, _timeout_ms: u32) -> Result<(), TransportError> {
        let name = self.name_of(handle);
        if self.failing.lock().unwrap().contains(&name) {
            return Err(TransportError::from("simulated read failure"));
        }
        Ok(())
    }

    fn get_size(&self, handle: TagHandle) -> Result<u32, TransportError> {
        let name = self.name_of(handle);
        if let Some(buf) = self.responses.get(&name) {
            return Ok(buf.len() as u32);
        }
        let values = self.scan_values.lock().unwrap();
        let len = values.get(&name).and_then(|q| q.front()).map(Vec::len).unwrap_or(0);
        Ok(len as u32)
    }

    fn get_raw_bytes(&self, handle: TagHandle, offset: u32, dst: &mut [u8]) -> Result<(), TransportError> {
        let name = self.name_of(handle);
        let start = offset as usize;

        if let Some(buf) = self.responses.get(&name) {
            dst.copy_from_slice(&buf[start..start + dst.len()]);
            return Ok(());
        }

        let mut values = self.scan_values.lock().unwrap();
        let entry = values.entry(name).or_default();
        let value = if entry.len() > 1 {
            entry.pop_front().unwrap()
        } else if let Some(v) = entry.front() {
            v.clone()
        } else {
            vec![0u8; dst.len()]
        };
        dst.copy_from_slice(&value[start..start + dst.len()]);
        Ok(())
    }

    fn shutdown(&self) {}
}

/// Builds one `@tags` record.
fn tag_record(type_code: u16, element_length: u16, dims: [u32; 3], name: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&type_code.to_le_bytes());
    buf.extend_from_slice(&element_length.to_le_bytes());
    for d in dims {
        buf.extend_from_slice(&d.to_le_bytes());
    }
    buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf
}

/// Builds one `@udt/<id>` response.
fn udt_record(udt_id: u16, total_size: u32, fields: &[(u16, u16, u32)], name: &str, field_names: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&udt_id.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&total_size.to_le_bytes());
    buf.extend_from_slice(&(fields.len() as u16).to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    for &(metadata, type_code, offset) in fields {
        buf.extend_from_slice(&metadata.to_le_bytes());
        buf.extend_from_slice(&type_code.to_le_bytes());
        buf.extend_from_slice(&offset.to_le_bytes());
    }
    buf.extend_from_slice(name.as_bytes());
    buf.push(0);
    for fname in field_names {
        buf.extend_from_slice(fname.as_bytes());
        buf.push(0);
    }
    buf
}

/// A `predicate` that lets exactly `n` scan cycles run.
fn countdown(n: u32) -> impl FnMut() -> bool {
    let remaining = Cell::new(n);
    move || {
        if remaining.get() == 0 {
            false
        } else {
            remaining.set(remaining.get() - 1);
            true
        }
    }
}

#[test]
fn empty_controller_has_no_tags_but_every_fixed_type() {
    init_tracing();
    let transport = Arc::new(MockTransport::new().with_pseudo_tag("@tags", Vec::new()));
    let mut data = plcscan_core::init();
    plcscan_core::connect(&mut data, transport, "192.168.1.10", "1,0", ConnectOptions::default()).unwrap();

    assert!(data.is_connected);
    assert_eq!(data.tags().count(), 0);
    assert_eq!(data.udt_types().count(), 0);
    assert!(data.data_types().count() > 0);

    let mut invocations = 0u32;
    plcscan_core::scan(&mut data, &ScanOptions::default(), |_snap| invocations += 1, countdown(1));
    assert_eq!(invocations, 1);

    plcscan_core::shutdown(data);
}

#[test]
fn single_bool_tag_is_admitted_with_expected_shape() {
    init_tracing();
    let tags_buf = tag_record(0x00C1, 1, [0, 0, 0], "Motor_Run");
    let transport = Arc::new(MockTransport::new().with_pseudo_tag("@tags", tags_buf));
    let mut data = plcscan_core::init();
    plcscan_core::connect(&mut data, transport, "gw", "1,0", ConnectOptions::default()).unwrap();

    let tags: Vec<_> = data.tags().collect();
    assert_eq!(tags.len(), 1);
    let tag = &tags[0];
    assert_eq!(tag.tag_name(), "Motor_Run");
    assert_eq!(tag.type_id().raw(), 0xC1);
    assert_eq!(tag.array_count(), 1);
    assert_eq!(tag.bytes().len(), 1);
    assert_eq!(tag.data_type_name(), "BOOL");
    assert_eq!(get_tag_type(tag.type_id()), TagType::Bool);
}

#[test]
fn int_array_tag_reports_total_element_count_and_size() {
    init_tracing();
    let tags_buf = tag_record(0x20C3, 2, [10, 0, 0], "Counters");
    let transport = Arc::new(MockTransport::new().with_pseudo_tag("@tags", tags_buf));
    let mut data = plcscan_core::init();
    plcscan_core::connect(&mut data, transport, "gw", "1,0", ConnectOptions::default()).unwrap();

    let tags: Vec<_> = data.tags().collect();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].array_count(), 10);
    assert_eq!(tags[0].bytes().len(), 20);
    assert_eq!(tags[0].data_type_name(), "INT");
}

#[test]
fn udt_tag_resolves_its_fields_and_data_type_name() {
    init_tracing();
    let tags_buf = tag_record(0x8001, 8, [0, 0, 0], "Pump1");
    let udt_buf = udt_record(1, 8, &[(1, 0x00CA, 0), (0, 0x00C1, 4)], "PumpUdt", &["Flow", "Running"]);

    let transport = Arc::new(
        MockTransport::new()
            .with_pseudo_tag("@tags", tags_buf)
            .with_pseudo_tag("@udt/1", udt_buf),
    );
    let mut data = plcscan_core::init();
    plcscan_core::connect(&mut data, transport, "gw", "1,0", ConnectOptions::default()).unwrap();

    let tags: Vec<_> = data.tags().collect();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].data_type_name(), "PumpUdt");
    assert_eq!(get_tag_type(tags[0].type_id()), TagType::Udt);

    let udts: Vec<_> = data.udt_types().collect();
    assert_eq!(udts.len(), 1);
    let fields: Vec<_> = udts[0].fields().collect();
    assert_eq!(fields[1].name(), "Running");
    assert_eq!(fields[1].bit_number(), 0);
    assert!(fields[1].is_bit());
    assert_eq!(fields[1].data_type_name(), "BOOL");
}

#[test]
fn unreadable_tags_response_fails_connect_without_crashing() {
    init_tracing();
    let transport = Arc::new(MockTransport::new().with_unreadable("@tags"));
    let mut data = plcscan_core::init();
    let err = plcscan_core::connect(&mut data, transport, "gw", "1,0", ConnectOptions::default());
    assert!(err.is_err());
    assert!(!data.is_connected);
}

#[test]
fn two_scan_cycles_publish_a_lagged_but_internally_consistent_snapshot() {
    init_tracing();
    let tags_buf = tag_record(0x00C3, 2, [0, 0, 0], "Speed");
    let mock = MockTransport::new().with_pseudo_tag("@tags", tags_buf);
    mock.queue_scan_values("Speed", vec![vec![0x01, 0x00], vec![0x02, 0x00]]);
    let transport = Arc::new(mock);

    let mut data = plcscan_core::init();
    plcscan_core::connect(&mut data, transport, "gw", "1,0", ConnectOptions::default()).unwrap();

    let mut snapshots: Vec<Vec<u8>> = Vec::new();
    plcscan_core::scan(
        &mut data,
        &ScanOptions::default(),
        |snap| snapshots.push(snap.public.to_vec()),
        countdown(3),
    );

    // Cycle 1's callback sees the zero-filled initial snapshot; cycle 2's
    // callback sees cycle 1's write; cycle 3's callback (after cycle 2's
    // flip) sees cycle 2's write.
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[0], vec![0x00, 0x00]);
    assert_eq!(snapshots[1], vec![0x01, 0x00]);
    assert_eq!(snapshots[2], vec![0x02, 0x00]);
}

#[test]
fn a_tag_that_never_reads_successfully_stays_zero_while_its_sibling_updates() {
    init_tracing();
    let mut tags_buf = tag_record(0x00C1, 1, [0, 0, 0], "Alpha");
    tags_buf.extend_from_slice(&tag_record(0x00C1, 1, [0, 0, 0], "Beta"));
    let mock = MockTransport::new().with_pseudo_tag("@tags", tags_buf);
    mock.set_failing("Alpha", true);
    mock.queue_scan_values("Beta", vec![vec![0x01], vec![0x02], vec![0x03]]);
    let transport = Arc::new(mock);

    let mut data = plcscan_core::init();
    plcscan_core::connect(&mut data, transport, "gw", "1,0", ConnectOptions::default()).unwrap();

    let names: Vec<String> = data.tags().map(|t| t.tag_name().to_string()).collect();
    let alpha_idx = names.iter().position(|n| n == "Alpha").unwrap();
    let beta_idx = names.iter().position(|n| n == "Beta").unwrap();

    let mut snapshots: Vec<Vec<u8>> = Vec::new();
    plcscan_core::scan(
        &mut data,
        &ScanOptions::default(),
        |snap| snapshots.push(snap.public.to_vec()),
        countdown(4),
    );

    for snap in &snapshots {
        assert_eq!(snap[alpha_idx], 0, "Alpha never read successfully; byte must stay zero");
    }
    assert_eq!(snapshots[3][beta_idx], 0x03, "Beta's bytes still advance despite Alpha's failures");

    let status = data.tag_status();
    assert!(status[alpha_idx].connected);
    assert!(!status[alpha_idx].last_scan_ok);
    assert!(status[beta_idx].last_scan_ok);

    plcscan_core::shutdown(data);
}
