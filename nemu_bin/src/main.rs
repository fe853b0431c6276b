use std::time::Duration;

use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};
use nemu_nes::{Nes, Rom, SCREEN_HEIGHT, SCREEN_WIDTH};

mod audio;

fn pad_state(window: &Window) -> u8 {
    let keys = [
        (Key::Z, 0),          // A
        (Key::X, 1),          // B
        (Key::RightShift, 2), // Select
        (Key::Enter, 3),      // Start
        (Key::Up, 4),
        (Key::Down, 5),
        (Key::Left, 6),
        (Key::Right, 7),
    ];

    keys.iter().fold(0u8, |state, &(key, bit)| {
        state | ((window.is_key_down(key) as u8) << bit)
    })
}

fn main() {
    env_logger::init();

    let mut bus_conflicts = false;
    let mut path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--bus-conflicts" => bus_conflicts = true,
            _ => path = Some(arg),
        }
    }
    let path = match path {
        Some(path) => path,
        None => {
            eprintln!("usage: nemu [--bus-conflicts] <rom.nes>");
            std::process::exit(2);
        }
    };

    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("{}: {}", path, err);
            std::process::exit(1);
        }
    };
    let mut rom = match Rom::parse(&data) {
        Ok(rom) => rom,
        Err(err) => {
            eprintln!("{}: {}", path, err);
            std::process::exit(1);
        }
    };
    rom.bus_conflicts = bus_conflicts;

    let mut nes = Nes::new(rom);

    let audio = audio::AudioOutput::new();
    if let Some(audio) = &audio {
        nes.set_sample_rate(audio.sample_rate());
    }

    let mut window = Window::new(
        "nemu",
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        WindowOptions {
            scale: Scale::X2,
            ..WindowOptions::default()
        },
    )
    .expect("open window");
    window.limit_update_rate(Some(Duration::from_micros(16_667)));

    let mut channels = [true; 5];
    let mut snapshot: Option<Vec<u8>> = None;
    let mut halted = false;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if window.is_key_pressed(Key::R, KeyRepeat::No) {
            nes.reset();
            halted = false;
        }
        if window.is_key_pressed(Key::F5, KeyRepeat::No) {
            match nes.save_state() {
                Ok(state) => snapshot = Some(state),
                Err(err) => log::error!("save state: {}", err),
            }
        }
        if window.is_key_pressed(Key::F7, KeyRepeat::No) {
            if let Some(state) = &snapshot {
                if let Err(err) = nes.load_state(state) {
                    log::error!("load state: {}", err);
                }
            }
        }
        for (i, key) in [Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5]
            .iter()
            .enumerate()
        {
            if window.is_key_pressed(*key, KeyRepeat::No) {
                channels[i] = !channels[i];
                nes.set_channels(&channels);
            }
        }

        let pad = pad_state(&window);
        {
            let frame = nes.run_frame(pad, 0);
            window
                .update_with_buffer(frame, SCREEN_WIDTH, SCREEN_HEIGHT)
                .expect("update window");
        }

        if let Some(audio) = &audio {
            audio.push(nes.get_audio(4096));
        }
        if let Some(halt) = nes.halt() {
            if !halted {
                log::error!("cpu halted: {:?}; press R to reset", halt);
                halted = true;
            }
        }
    }
}
