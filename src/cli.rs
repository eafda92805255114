use anyhow::{Context, Result, anyhow};
use log::info;
use pico_args::Arguments;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use callscreen::config::{Profile, ProfileStore};
use callscreen::corner::{self, FlingThresholds};
use callscreen::geometry::{Point, Vector};
use callscreen::input;
use callscreen::phase::{CallPhase, CallUpdate, VideoState};
use callscreen::screen::{CallScreen, Presenter, ScreenEvent};
use callscreen::script::{self, JsonLinesPresenter, ReplayTransport, Script};
use callscreen::slots::Role;
use callscreen::tracker::Tracker;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let profile_name: Option<String> = pargs.opt_value_from_str("--profile")?;

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("replay") => {
            let path: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: callscreen replay <script.toml> [--profile NAME]"))?;
            let profile = resolve_profile(profile_name.as_deref())?;
            let script = Script::load(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            let screen = script::replay(&script, profile, JsonLinesPresenter::new(io::stdout()));
            print_final(&screen);
            Ok(())
        }

        Some("corner") => {
            let usage = || anyhow!("usage: callscreen corner <x> <y> <vx> <vy> [--profile NAME]");
            let x: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let y: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let vx: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let vy: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let profile = resolve_profile(profile_name.as_deref())?;
            let position = Point::new(x, y);
            let velocity = Vector::new(vx, vy);
            let screen = profile.screen.size();
            let th = FlingThresholds::from(&profile.gestures);
            print_response(&serde_json::json!({
                "quadrant": corner::quadrant_of(position, screen),
                "angle": corner::fling_angle(velocity),
                "speed": velocity.length(),
                "corner": corner::resting_corner(position, velocity, screen, &th),
            }));
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: callscreen use <profile_name>"))?;
            let mut store = ProfileStore::load_or_install_default()?;
            store.set_active(&name)?;
            println!("ok: active profile is now {}", store.active_name);
            Ok(())
        }

        Some("list") => {
            let store = ProfileStore::load_or_install_default()?;
            for name in store.list_profiles() {
                let mark = if name == store.active_name { "*" } else { " " };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("show") => {
            let profile = resolve_profile(profile_name.as_deref())?;
            print_response(&serde_json::to_value(&profile)?);
            Ok(())
        }

        Some("devices") => {
            let devices: Vec<_> = input::discover_touchscreens()
                .into_iter()
                .map(|d| serde_json::json!({ "path": d.path, "name": d.name }))
                .collect();
            print_response(&serde_json::Value::Array(devices));
            Ok(())
        }

        Some("touch") => {
            let profile = resolve_profile(profile_name.as_deref())?;
            run_touch(profile)
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn resolve_profile(name: Option<&str>) -> Result<Profile> {
    let store = ProfileStore::load_or_install_default()?;
    match name {
        Some(n) => store.get(n),
        None => Ok(store.profile),
    }
}

fn print_final<P: Presenter>(screen: &CallScreen<ReplayTransport, P>) {
    let line = serde_json::json!({
        "event": "final",
        "at_ms": screen.now().as_millis() as u64,
        "roles": screen.roles(),
        "background": screen.background(),
        "chrome_visible": screen.chrome_visible(),
        "ambient_running": screen.ambient_running(),
        "incoming_available": screen.video_available(Role::Incoming),
        "outgoing_available": screen.video_available(Role::Outgoing),
        "views_released": screen.transport().released.len(),
    });
    println!("{line}");
}

/// Brings up a connected two-party call so live touches have both videos
/// to act on.
fn start_demo_call<P: Presenter>(screen: &mut CallScreen<ReplayTransport, P>) {
    let update = CallUpdate::new(CallPhase::Active)
        .with_reception(4)
        .with_remote_video(VideoState::Active)
        .with_local_video(VideoState::Active);
    screen.update_call_state(update);
    for role in Role::ALL {
        if let Some((id, view)) = screen.transport_mut().deliver(role, false) {
            screen.on_view_created(id, view);
        }
        if let Some(view) = screen.transport().view(role) {
            screen.on_first_frame(view);
        }
    }
}

fn run_touch(profile: Profile) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&stop))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&stop))?;

    let devs = input::open_touchscreens()?;
    let tracker = Tracker::new(profile.touch.clone(), profile.screen.size());
    let (tx, rx) = mpsc::channel::<ScreenEvent>();
    let pump_stop = Arc::clone(&stop);
    let pump = thread::spawn(move || input::pump(devs, tracker, tx, pump_stop));

    let mut screen = CallScreen::new(
        profile,
        ReplayTransport::default(),
        JsonLinesPresenter::new(io::stdout()),
    );
    start_demo_call(&mut screen);
    info!("touch: demo call up, Ctrl-C to stop");

    let base = screen.now();
    let started = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        match rx.recv_timeout(Duration::from_millis(16)) {
            Ok(event) => screen.handle(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        screen.advance_to(base + started.elapsed());
    }

    stop.store(true, Ordering::Relaxed);
    match pump.join() {
        Ok(result) => result?,
        Err(_) => return Err(anyhow!("input thread panicked")),
    }
    print_final(&screen);
    info!("touch: stopped");
    Ok(())
}

fn print_help() {
    println!(
        r#"callscreen - call-screen layout and gesture controller

USAGE:
  callscreen help [command]                  Show general or command-specific help
  callscreen replay <script.toml>            Replay a call timeline, print JSON lines
  callscreen corner <x> <y> <vx> <vy>        Predict where a released preview rests
  callscreen touch                           Drive a demo call from the touchscreen
  callscreen devices                         List detected touchscreens
  callscreen use <name>                      Switch active profile
  callscreen list                            List profiles
  callscreen show                            Print the active profile

OPTIONS:
  --profile <name>                           Use <name> instead of the active profile

TIPS:
  - Profiles: ~/.config/callscreen/profiles
  - Active profile pointer: ~/.config/callscreen/active
  - RUST_LOG=debug shows every timer and slot transition
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "replay" => println!(
            "usage: callscreen replay <script.toml> [--profile NAME]\nRuns the [[step]] timeline on a virtual clock and prints one JSON object per relayout, background fade, ambient change or dismissal."
        ),
        "corner" => println!(
            "usage: callscreen corner <x> <y> <vx> <vy> [--profile NAME]\nPosition in screen points, velocity in points/s with +y down."
        ),
        "touch" => println!(
            "usage: callscreen touch [--profile NAME]\nReads the first touchscreen under /dev/input and drives a connected demo call."
        ),
        "devices" => println!("usage: callscreen devices\nLists multitouch devices under /dev/input."),
        "use" => {
            println!("usage: callscreen use <name>\nSwitches the active profile to <name>.")
        }
        "list" => {
            println!("usage: callscreen list\nLists available profiles; marks active with '*'.")
        }
        "show" => println!("usage: callscreen show [--profile NAME]\nPrints the profile as JSON."),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
