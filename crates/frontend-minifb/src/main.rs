//! Intel 8080 emulator frontend.
//!
//! Provides three execution modes:
//!
//! - **GUI mode** (default): Scaled window rendering the memory-mapped
//!   raster region, quick save/load, Esc to quit.
//! - **Headless mode** (`--headless`): Run to completion and print an
//!   ASCII snapshot of the raster plus a register dump.
//! - **Step mode** (`--step`): Interactive instruction-level debugger.
//!
//! The frontend owns everything the core treats as a collaborator: it
//! loads the program image, drives the step loop until the CPU halts or
//! the window closes, renders the raster between steps, and (with
//! `--trace-io`) attaches a port device that logs IN/OUT traffic.

use i8080_core::{
    display, savestate, Machine, PortBus, CLOCK_HZ, DISPLAY_HEIGHT, DISPLAY_WIDTH,
};
use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};
use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Cycles per frame at 60 Hz.
const CYCLES_PER_FRAME: u64 = (CLOCK_HZ / 60) as u64;
/// Default instruction budget for headless runs.
const DEFAULT_HEADLESS_STEPS: usize = 1_000_000;

/// Port device that logs traffic instead of modeling hardware.
struct TracePorts;

impl PortBus for TracePorts {
    fn port_in(&mut self, port: u8) -> u8 {
        log::info!("IN  port 0x{:02X} -> 0xFF (no device)", port);
        0xFF
    }

    fn port_out(&mut self, port: u8, val: u8) {
        log::info!("OUT port 0x{:02X} <- 0x{:02X}", port, val);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Intel 8080 Emulator - Rust");
        eprintln!("Usage: {} <program.img> [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --headless       Run without a window");
        eprintln!(
            "  --steps N        Instruction budget for headless mode (default {})",
            DEFAULT_HEADLESS_STEPS
        );
        eprintln!("  --step           Interactive step debugger");
        eprintln!("  --scale N        Window scale 1-8 (default 8)");
        eprintln!("  --trace-io       Log IN/OUT port traffic");
        eprintln!();
        eprintln!("GUI keys: F5=Save state  F9=Load state  Esc=Quit");
        std::process::exit(1);
    }

    let image_path = &args[1];
    let headless = args.iter().any(|a| a == "--headless");
    let step_mode = args.iter().any(|a| a == "--step");
    let trace_io = args.iter().any(|a| a == "--trace-io");

    let scale: usize = args
        .iter()
        .position(|a| a == "--scale")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(8)
        .clamp(1, 8);

    let data = match fs::read(image_path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{}: {}", image_path, e);
            std::process::exit(1);
        }
    };

    let mut machine = if trace_io {
        Machine::with_ports(Box::new(TracePorts))
    } else {
        Machine::new()
    };
    match machine.load_image(&data) {
        Ok(size) => log::info!("{}: {} program bytes", image_path, size),
        Err(e) => {
            eprintln!("{}: {}", image_path, e);
            std::process::exit(1);
        }
    }

    if step_mode {
        run_step_mode(&args, &mut machine);
    } else if headless {
        run_headless(&args, &mut machine);
    } else {
        run_gui(&mut machine, image_path, scale);
    }
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

fn run_gui(machine: &mut Machine, image_path: &str, scale: usize) {
    let scaled_w = DISPLAY_WIDTH * scale;
    let scaled_h = DISPLAY_HEIGHT * scale;

    let mut window = Window::new(
        "i8080 Emulator",
        scaled_w,
        scaled_h,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    )
    .expect("Failed to create window");
    window.set_target_fps(60);

    let state_file = savestate::state_path(image_path);
    let mut scaled_buf = vec![0u32; scaled_w * scaled_h];
    let mut prev_f5 = false;
    let mut prev_f9 = false;
    let mut reported_stop = false;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        // Quick save (F5) / quick load (F9)
        let f5 = window.is_key_down(Key::F5);
        if f5 && !prev_f5 {
            match savestate::save_to_file(&machine.save_state(), Path::new(&state_file)) {
                Ok(()) => eprintln!("State saved: {}", state_file),
                Err(e) => eprintln!("Save error: {}", e),
            }
        }
        prev_f5 = f5;

        let f9 = window.is_key_down(Key::F9);
        if f9 && !prev_f9 {
            match savestate::load_from_file(Path::new(&state_file)) {
                Ok(state) => {
                    machine.restore_state(&state);
                    reported_stop = false;
                    eprintln!("State loaded: {}", state_file);
                }
                Err(e) => eprintln!("Load error: {}", e),
            }
        }
        prev_f9 = f9;

        if !machine.halted() {
            match machine.run(CYCLES_PER_FRAME) {
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Stopped: {}\n{}", e, machine.dump_regs());
                    break;
                }
            }
        }
        if machine.halted() && !reported_stop {
            reported_stop = true;
            window.set_title("i8080 Emulator - HALTED");
            log::info!("halted after {} cycles", machine.cpu.tick);
        }

        // Render the raster, scaled up pixel by pixel
        let pixels = machine.framebuffer_u32();
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                let color = pixels[y * DISPLAY_WIDTH + x];
                for sy in 0..scale {
                    let base = (y * scale + sy) * scaled_w + x * scale;
                    scaled_buf[base..base + scale].fill(color);
                }
            }
        }
        window
            .update_with_buffer(&scaled_buf, scaled_w, scaled_h)
            .expect("window update");
    }
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(args: &[String], machine: &mut Machine) {
    let max_steps: usize = args
        .iter()
        .position(|a| a == "--steps")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_HEADLESS_STEPS);

    let mut steps = 0usize;
    while steps < max_steps && !machine.halted() {
        if let Err(e) = machine.step() {
            eprintln!("Stopped: {}", e);
            break;
        }
        steps += 1;
    }

    print_display(machine);
    println!("{}", machine.dump_regs());
    println!(
        "{} instructions, {} cycles{}",
        steps,
        machine.cpu.tick,
        if machine.halted() { ", halted" } else { "" }
    );
}

/// Print the raster as half-block characters, two rows per line.
fn print_display(machine: &Machine) {
    let region = machine.display_region();
    println!("({} px lit)", display::lit_count(region));
    for y in (0..DISPLAY_HEIGHT).step_by(2) {
        let mut line = String::with_capacity(DISPLAY_WIDTH + 2);
        line.push('|');
        for x in 0..DISPLAY_WIDTH {
            let top = region[y * DISPLAY_WIDTH + x] != 0;
            let bottom = y + 1 < DISPLAY_HEIGHT && region[(y + 1) * DISPLAY_WIDTH + x] != 0;
            line.push(match (top, bottom) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                _ => ' ',
            });
        }
        line.push('|');
        println!("{}", line);
    }
}

// ─── Step Mode ──────────────────────────────────────────────────────────────

fn run_step_mode(args: &[String], machine: &mut Machine) {
    let run_budget: usize = args
        .iter()
        .position(|a| a == "--steps")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_HEADLESS_STEPS);

    println!("Step mode: Enter=step, N<enter>=step N, r=run to halt, d=dump, q=quit");
    println!("{}", machine.dump_regs());
    println!("Next: {}", machine.disasm_at_pc());

    let stdin = std::io::stdin();
    let mut steps = 0usize;
    loop {
        let mut line = String::new();
        print!("step> ");
        let _ = std::io::stdout().flush();
        if stdin.read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let cmd = line.trim();
        match cmd {
            "q" | "quit" => break,
            "d" | "dump" => {
                println!("{}", machine.dump_regs());
                continue;
            }
            "r" | "run" => {
                for _ in 0..run_budget {
                    if machine.halted() {
                        break;
                    }
                    if let Err(e) = machine.step() {
                        println!("Stopped: {}", e);
                        break;
                    }
                    steps += 1;
                }
                println!("{}", machine.dump_regs());
                println!("Next: {}", machine.disasm_at_pc());
                continue;
            }
            _ => {}
        }
        let n: usize = cmd.parse().unwrap_or(1);
        for i in 0..n {
            match machine.step_one() {
                Ok(asm) => {
                    steps += 1;
                    if n <= 20 {
                        println!("  {}", asm);
                    } else if i == n - 1 {
                        println!("  ... {} steps, last: {}", n, asm);
                    }
                }
                Err(e) => {
                    println!("Stopped: {}", e);
                    break;
                }
            }
        }
        println!("{}", machine.dump_regs());
        println!("Next: {}", machine.disasm_at_pc());
    }
    println!("Total: {} steps, {} cycles", steps, machine.cpu.tick);
}
