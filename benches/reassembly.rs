/// Fragment reassembly benchmarks
///
/// Measures multi-datagram snapshot sequences and fragmented incremental
/// transactions end to end through the decoder.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use byteorder::{LittleEndian, WriteBytesExt};
use simba_feed::SimbaDecoder;

fn market_data_header(seq: u32, flags: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    buf.write_u32::<LittleEndian>(seq).unwrap();
    buf.write_u16::<LittleEndian>(0).unwrap();
    buf.write_u16::<LittleEndian>(flags).unwrap();
    buf.write_u64::<LittleEndian>(1_650_000_000_000_000_000).unwrap();
    buf
}

fn snapshot_fragment(seq: u32, security_id: i32, entries: u8, flags: u16) -> Vec<u8> {
    let mut payload = market_data_header(seq, flags);
    payload.write_u16::<LittleEndian>(16).unwrap();
    payload.write_u16::<LittleEndian>(17).unwrap();
    payload.write_u16::<LittleEndian>(19780).unwrap();
    payload.write_u16::<LittleEndian>(4).unwrap();
    payload.write_i32::<LittleEndian>(security_id).unwrap();
    payload.write_u32::<LittleEndian>(seq).unwrap();
    payload.write_u32::<LittleEndian>(seq).unwrap();
    payload.write_u32::<LittleEndian>(4242).unwrap();
    payload.write_u16::<LittleEndian>(57).unwrap();
    payload.push(entries);
    for i in 0..entries {
        payload.write_i64::<LittleEndian>(i64::from(i)).unwrap();
        payload.write_u64::<LittleEndian>(u64::from(seq)).unwrap();
        payload.write_i64::<LittleEndian>(2_500_000).unwrap();
        payload.write_i64::<LittleEndian>(10).unwrap();
        payload.write_i64::<LittleEndian>(0).unwrap();
        payload.write_u64::<LittleEndian>(1).unwrap();
        payload.write_u64::<LittleEndian>(0).unwrap();
        payload.push(b'0');
    }
    payload
}

fn order_update_fragment(seq: u32, security_id: i32, flags: u16) -> Vec<u8> {
    let mut payload = market_data_header(seq, flags);
    payload.write_u64::<LittleEndian>(u64::from(seq)).unwrap();
    payload.write_u32::<LittleEndian>(4242).unwrap();
    payload.write_u16::<LittleEndian>(50).unwrap();
    payload.write_u16::<LittleEndian>(15).unwrap();
    payload.write_u16::<LittleEndian>(19780).unwrap();
    payload.write_u16::<LittleEndian>(4).unwrap();
    payload.write_i64::<LittleEndian>(i64::from(seq)).unwrap();
    payload.write_i64::<LittleEndian>(2_500_000).unwrap();
    payload.write_i64::<LittleEndian>(100).unwrap();
    payload.write_u64::<LittleEndian>(1).unwrap();
    payload.write_u64::<LittleEndian>(0).unwrap();
    payload.write_i32::<LittleEndian>(security_id).unwrap();
    payload.write_u32::<LittleEndian>(seq).unwrap();
    payload.push(0);
    payload.push(b'0');
    payload
}

/// One full snapshot sequence: start fragment carrying the entries, then
/// middle and terminal continuations.
fn snapshot_sequence(fragments: usize, entries: u8) -> Vec<Vec<u8>> {
    let mut sequence = Vec::with_capacity(fragments);
    sequence.push(snapshot_fragment(1, 42, entries, 0x02));
    for seq in 1..fragments.saturating_sub(1) {
        sequence.push(snapshot_fragment(seq as u32 + 1, 42, 0, 0x00));
    }
    sequence.push(snapshot_fragment(fragments as u32, 42, 0, 0x04));
    sequence
}

fn bench_snapshot_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_reassembly");

    for fragments in [2usize, 8, 32].iter() {
        let sequence = snapshot_sequence(*fragments, 50);

        group.bench_with_input(
            BenchmarkId::from_parameter(fragments),
            fragments,
            |b, _| {
                // Fresh decoder per batch so replayed seq numbers do not
                // accumulate as transport gaps.
                b.iter_batched(
                    SimbaDecoder::new,
                    |mut decoder| {
                        let mut decoded = None;
                        for fragment in &sequence {
                            decoded = decoder.decode(black_box(fragment));
                        }
                        decoded
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_incremental_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_reassembly");

    let fragments = vec![
        order_update_fragment(1, 42, 0x08),
        order_update_fragment(2, 42, 0x08),
        order_update_fragment(3, 42, 0x09),
    ];

    group.bench_function("three_fragments", |b| {
        b.iter_batched(
            SimbaDecoder::new,
            |mut decoder| {
                let mut decoded = None;
                for fragment in &fragments {
                    decoded = decoder.decode(black_box(fragment));
                }
                decoded
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_snapshot_reassembly, bench_incremental_reassembly);
criterion_main!(benches);
