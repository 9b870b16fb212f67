use tonegen::{Command, ParameterController, ToneConfig, ToneGenerator, Voice};
#[cfg(feature = "device")]
use tonegen::Engine;
#[cfg(not(feature = "device"))]
use tonegen::{SampleGenerator, BLOCK_SIZE};

use crossbeam_channel::{unbounded, Receiver, Sender};
use flexi_logger::{FileSpec, Logger};
use log::info;
#[cfg(feature = "device")]
use log::error;

#[cfg(not(feature = "device"))]
use std::fs::OpenOptions;
use std::io::prelude::*;
use std::io;
#[cfg(not(feature = "device"))]
use std::io::BufWriter;
use std::path::Path;
use std::thread::spawn;

/* Reads commands from stdin until EOF, then asks the main loop to quit. */
fn spawn_command_reader(sender: Sender<Command>) {
    spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(cmd) => {
                    if sender.send(cmd).is_err() {
                        return;
                    }
                }
                Err(e) => println!("{}", e),
            }
        }
        let _ = sender.send(Command::Quit);
    });
}

/* Applies a control command. Returns false when the driver should exit. */
fn handle_control(ctrl: &ParameterController, cmd: Command) -> bool {
    match cmd {
        Command::Frequency(f) => {
            let applied = ctrl.set_frequency(f);
            println!("frequency {} Hz", applied);
        }
        Command::Play => ctrl.play(),
        Command::Stop => ctrl.stop(),
        Command::Status => {
            println!("{} Hz, {}", ctrl.frequency(), if ctrl.is_playing() { "playing" } else { "stopped" });
        }
        Command::Render(_) => (),
        Command::Quit => return false,
    }
    true
}

#[cfg(feature = "device")]
fn run(ctrl: ParameterController, voice: Voice, _config: &ToneConfig, commands: Receiver<Command>) -> Result<(), failure::Error> {
    let (err_sender, err_receiver) = unbounded::<String>();
    let engine = Engine::start(voice, err_sender)?;
    println!("Playing through output device at {} Hz, {} channel(s)", engine.get_sample_rate(), engine.get_channels());
    loop {
        crossbeam_channel::select! {
            recv(commands) -> cmd => {
                let cmd = match cmd {
                    Ok(c) => c,
                    Err(_) => break,
                };
                if let Command::Render(_) = cmd {
                    println!("render is only available without an output device");
                }
                if !handle_control(&ctrl, cmd) {
                    break;
                }
            }
            recv(err_receiver) -> err => {
                if let Ok(e) = err {
                    error!("Audio stream error: {}", e);
                }
            }
        }
    }
    ctrl.stop();
    // Give the voice time to ramp down before the stream is dropped
    std::thread::sleep(std::time::Duration::from_millis(50));
    Ok(())
}

#[cfg(not(feature = "device"))]
fn run(ctrl: ParameterController, mut voice: Voice, config: &ToneConfig, commands: Receiver<Command>) -> Result<(), failure::Error> {
    let file = OpenOptions::new().create(true).append(true).open(&config.output_file)?;
    let mut writer = BufWriter::new(file);
    println!("No output device, rendering into {}", config.output_file);
    let mut block = [0.0f32; BLOCK_SIZE];
    for cmd in commands.iter() {
        if let Command::Render(ms) = cmd {
            let mut remaining = (ms * voice.sample_rate() as f64 / 1000.0).round() as usize;
            while remaining > 0 {
                let len = remaining.min(BLOCK_SIZE);
                voice.produce_block(&mut block[..len]);
                for sample in block[..len].iter() {
                    writer.write_fmt(format_args!("{:.*}\n", 5, sample))?;
                }
                remaining -= len;
            }
            writer.flush()?;
            println!("rendered {} ms, {:?}", ms, voice.voice_state());
        }
        if !handle_control(&ctrl, cmd) {
            break;
        }
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<(), failure::Error> {
    let _logger = Logger::try_with_env_or_str("info")?
        .log_to_file(FileSpec::default().directory("log"))
        .start()?;

    let config = match std::env::args().nth(1) {
        Some(path) => ToneConfig::load(Path::new(&path))?,
        None => ToneConfig::default(),
    };
    let (ctrl, voice) = ToneGenerator::init(&config)?;
    info!("Starting tonegen");

    let (cmd_sender, cmd_receiver) = unbounded::<Command>();
    spawn_command_reader(cmd_sender);
    run(ctrl, voice, &config, cmd_receiver)?;

    info!("Exiting tonegen");
    Ok(())
}
