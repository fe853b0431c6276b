use nemu_nes::{Nes, Rom, RomError, SCREEN_HEIGHT, SCREEN_WIDTH};

/// minimal NROM image: `program` at 0xc000, reset vector 0xc000
fn nrom(program: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 16 + 0x4000 + 0x2000];
    data[..4].copy_from_slice(b"NES\x1a");
    data[4] = 1; // one PRG bank
    data[5] = 1; // one CHR bank
    data[16..16 + program.len()].copy_from_slice(program);
    data[16 + 0x3ffc] = 0x00;
    data[16 + 0x3ffd] = 0xc0;
    data
}

fn boot(program: &[u8]) -> Nes {
    Nes::new(Rom::parse(&nrom(program)).unwrap())
}

#[test]
fn frame_has_exactly_256_by_240_pixels() {
    let mut nes = boot(&[0x4c, 0x00, 0xc0]);
    let frame = nes.run_frame(0, 0);
    assert_eq!(frame.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
}

#[test]
fn rejects_non_ines_data() {
    assert!(matches!(Rom::parse(b"garbage"), Err(RomError::BadMagic)));
}

#[test]
fn audio_is_paced_to_the_sample_rate() {
    let mut nes = boot(&[0x4c, 0x00, 0xc0]);
    nes.set_sample_rate(48_000);

    nes.run_frame(0, 0);
    nes.get_audio(usize::MAX); // drain

    nes.run_frame(0, 0);
    let n = nes.get_audio(4096).len();
    assert!((750..=850).contains(&n), "{} samples in one frame", n);
}

#[test]
fn save_states_replay_identically() {
    let program = [
        0xa9, 0x1e, // LDA #$1e
        0x8d, 0x01, 0x20, // STA $2001
        0xe6, 0x10, // INC $10
        0x4c, 0x05, 0xc0, // JMP $c005
    ];
    let mut nes = boot(&program);
    for _ in 0..2 {
        nes.run_frame(0, 0);
    }

    let snapshot = nes.save_state().unwrap();
    let mut replay = boot(&program);
    replay.load_state(&snapshot).unwrap();

    let a: Vec<u32> = nes.run_frame(0, 0).to_vec();
    let b: Vec<u32> = replay.run_frame(0, 0).to_vec();
    assert_eq!(a, b);
    assert_eq!(nes.cpu().cycles(), replay.cpu().cycles());
}

#[test]
fn controllers_shift_out_in_button_order() {
    // strobe, then store eight reads of 0x4016 into 0x00..0x08
    let mut nes = boot(&[
        0xa9, 0x01, // LDA #$01
        0x8d, 0x16, 0x40, // STA $4016
        0xa9, 0x00, // LDA #$00
        0x8d, 0x16, 0x40, // STA $4016
        0xa2, 0x00, // LDX #$00
        0xad, 0x16, 0x40, // loop: LDA $4016
        0x95, 0x00, // STA $00,X
        0xe8, // INX
        0xe0, 0x08, // CPX #$08
        0xd0, 0xf6, // BNE loop
        0x4c, 0x16, 0xc0, // JMP self
    ]);

    // A, Select, Up held
    nes.run_frame(0b0001_0101, 0);
    nes.run_frame(0b0001_0101, 0);

    let cpu = nes.cpu().status();
    assert_eq!(cpu.pc, 0xc016);
    let bus = nes.bus();
    let read: Vec<u8> = (0..8).map(|i| bus.inspect(i) & 1).collect();
    assert_eq!(read, vec![1, 0, 1, 0, 1, 0, 0, 0]);
}
