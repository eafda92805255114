//! Touchscreen discovery and the raw event pump (evdev 0.13).

use anyhow::{Result, anyhow};
use evdev::{AbsoluteAxisCode, Device, EventType, SynchronizationCode};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use crate::screen::ScreenEvent;
use crate::tracker::Tracker;

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
}

pub fn discover_touchscreens() -> Vec<DeviceInfo> {
    let mut out = vec![];
    let Ok(rd) = std::fs::read_dir("/dev/input") else {
        return out;
    };
    for e in rd.flatten() {
        let p = e.path();
        let is_event = p
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.starts_with("event"));
        if !is_event {
            continue;
        }
        let Ok(dev) = Device::open(&p) else {
            continue;
        };
        let has_abs = dev.supported_events().contains(EventType::ABSOLUTE);
        let has_mt = dev.supported_absolute_axes().is_some_and(|a| {
            a.contains(AbsoluteAxisCode::ABS_MT_SLOT)
                && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_X)
                && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_Y)
        });
        if has_abs && has_mt {
            out.push(DeviceInfo {
                path: p.display().to_string(),
                name: dev.name().unwrap_or("unknown").to_string(),
            });
        }
    }
    out
}

pub fn open_touchscreens() -> Result<Vec<Device>> {
    let mut devs = vec![];
    for d in discover_touchscreens() {
        match Device::open(&d.path) {
            Ok(mut dev) => {
                if let Err(e) = dev.set_nonblocking(true) {
                    warn!("{}: cannot switch to non-blocking: {e}", d.path);
                    continue;
                }
                info!("input: using {} ({})", d.path, d.name);
                devs.push(dev);
            }
            Err(e) => warn!("failed to open {}: {e}", d.path),
        }
    }
    if devs.is_empty() {
        return Err(anyhow!("no usable touchscreen under /dev/input"));
    }
    Ok(devs)
}

/// Reads every device until `stop` is raised, forwarding tracker output to
/// the thread that owns the call screen.
pub fn pump(
    mut devs: Vec<Device>,
    mut tracker: Tracker,
    tx: Sender<ScreenEvent>,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    let start = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        let mut any_event = false;
        for dev in devs.iter_mut() {
            let Ok(events) = dev.fetch_events() else {
                continue;
            };
            for ev in events {
                any_event = true;
                if ev.event_type() == EventType::ABSOLUTE {
                    match ev.code() {
                        c if c == AbsoluteAxisCode::ABS_MT_SLOT.0 => tracker.on_slot(ev.value()),
                        c if c == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 => {
                            tracker.on_tracking_id(ev.value())
                        }
                        c if c == AbsoluteAxisCode::ABS_MT_POSITION_X.0 => {
                            tracker.on_pos_x(ev.value())
                        }
                        c if c == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 => {
                            tracker.on_pos_y(ev.value())
                        }
                        _ => {}
                    }
                } else if ev.event_type() == EventType::SYNCHRONIZATION
                    && ev.code() == SynchronizationCode::SYN_REPORT.0
                {
                    let now_ms = start.elapsed().as_millis() as u64;
                    for output in tracker.on_syn_report(now_ms) {
                        debug!("input: {output:?}");
                        if tx.send(ScreenEvent::Touch(output)).is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
        if !any_event {
            thread::sleep(Duration::from_millis(4));
        }
    }
    Ok(())
}
