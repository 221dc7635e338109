use criterion::{black_box, criterion_group, criterion_main, Criterion};
use redline_editor::{EditProposal, TextLocator};

fn long_paragraph() -> String {
    let sentence = "The Supplier shall deliver the Goods to the Delivery Location on the Delivery Date. ";
    let mut text = sentence.repeat(20);
    text.push_str("Risk in the Goods passes to the Customer on completion of delivery.");
    text
}

fn locate_exact(c: &mut Criterion) {
    let text = long_paragraph();
    let locator = TextLocator::default();
    let proposal = EditProposal::new("Risk in the Goods", "Title to the Goods");

    c.bench_function("locate_exact", |b| {
        b.iter(|| locator.locate(black_box(&text), black_box(&proposal)))
    });
}

fn locate_with_context(c: &mut Criterion) {
    let text = long_paragraph();
    let locator = TextLocator::default();
    let proposal = EditProposal::new("the Customer", "the Buyer")
        .with_context("Risk in the Goods passes to the Customer on completion of delivery.");

    c.bench_function("locate_with_context", |b| {
        b.iter(|| locator.locate(black_box(&text), black_box(&proposal)))
    });
}

fn locate_fuzzy(c: &mut Criterion) {
    let text = long_paragraph();
    let locator = TextLocator::default();
    let proposal = EditProposal::new("passes to the Custmer on completion", "passes on payment");

    c.bench_function("locate_fuzzy", |b| {
        b.iter(|| locator.locate(black_box(&text), black_box(&proposal)))
    });
}

criterion_group!(benches, locate_exact, locate_with_context, locate_fuzzy);
criterion_main!(benches);
