use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chip8_vm::prelude::*;

/// Endless loop that walks the font glyphs across the screen.
#[rustfmt::skip]
const PROGRAM: &[u8] = &[
    0x60, 0x00, // 200: LD V0, 00
    0x61, 0x00, // 202: LD V1, 00
    0x62, 0x00, // 204: LD V2, 00
    0xF2, 0x29, // 206: LD F, V2
    0xD0, 0x15, // 208: DRW V0, V1, 5
    0x70, 0x05, // 20A: ADD V0, 05
    0x72, 0x01, // 20C: ADD V2, 01
    0x82, 0x0E, // 20E: SHL V2
    0x82, 0x06, // 210: SHR V2
    0x12, 0x06, // 212: JP 206
];

fn criterion_benchmark(c: &mut Criterion) {
    {
        let mut vm = Chip8Vm::new(Chip8Conf {
            rng_seed: Some(0),
            ..Chip8Conf::default()
        })
        .unwrap();
        vm.load_rom(PROGRAM).unwrap();

        c.bench_function("glyph loop", |b| {
            b.iter(|| {
                let cycle_count = black_box(1000_usize);
                black_box(vm.run_cycles(cycle_count))
            })
        });
    }

    c.bench_function("disassemble all words", |b| {
        b.iter(|| {
            for word in 0..=u16::MAX {
                black_box(disassemble(black_box(word)));
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
