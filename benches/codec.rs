use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cgrcrab::mdl::parse_molfile;
use cgrcrab::{
    BondOrder, CgrReader, CgrWriter, DynAtom, DynBond, DynGraph, Element, ReaderOptions,
    SdfReader, SdfWriter, WriterOptions,
};

// polyene chain hydrogenated every other bond
fn chain(len: u32) -> DynGraph {
    let mut g = DynGraph::new();
    let mut previous = None;
    for i in 0..len {
        let atom = DynAtom::new(Element::C).with_position([1.3 * f64::from(i), 0.0, 0.0]);
        let id = g.add_atom(atom);
        if let Some(prev) = previous {
            let bond = if i % 2 == 1 {
                DynBond::new(Some(BondOrder::Double), Some(BondOrder::Single))
            } else {
                DynBond::fixed(BondOrder::Single)
            };
            let _ = g.add_bond(prev, id, bond);
        }
        previous = Some(id);
    }
    g
}

fn bench_encode(c: &mut Criterion) {
    let g = chain(200);
    let writer = CgrWriter::new(WriterOptions {
        extended_labels: true,
        ..WriterOptions::default()
    });
    let marked = g.with_query_marks();

    c.bench_function("encode_chain_200", |b| {
        b.iter(|| black_box(writer.format_graph(&marked)))
    });
}

fn bench_decode(c: &mut Criterion) {
    let g = chain(200).with_query_marks();
    let writer = CgrWriter::new(WriterOptions {
        extended_labels: true,
        ..WriterOptions::default()
    });
    let text = format!("{}M  END\n", writer.format_graph(&g).block);
    let reader = CgrReader::default();

    c.bench_function("decode_chain_200", |b| {
        b.iter(|| {
            let block = parse_molfile(black_box(&text)).unwrap();
            black_box(reader.molecule(block).unwrap())
        })
    });
}

fn bench_sdf_stream(c: &mut Criterion) {
    let mut writer = SdfWriter::new(Vec::new(), WriterOptions::default());
    let g = chain(40);
    for _ in 0..100 {
        writer.write(&g).unwrap();
    }
    let text = String::from_utf8(writer.into_inner()).unwrap();

    c.bench_function("sdf_read_100x40", |b| {
        b.iter(|| {
            let input = Cursor::new(black_box(text.as_str()));
            let reader = SdfReader::new(input, ReaderOptions::default());
            black_box(reader.filter_map(Result::ok).count())
        })
    });
}

fn bench_center(c: &mut Criterion) {
    let g = chain(500);

    c.bench_function("center_and_decompose_500", |b| {
        b.iter(|| {
            let fresh = g.clone();
            black_box(fresh.center_atoms(false).len());
            black_box(fresh.decompose())
        })
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_sdf_stream,
    bench_center,
);
criterion_main!(benches);
