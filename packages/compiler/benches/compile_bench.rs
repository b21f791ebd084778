use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mortar_compiler::Compiler;

fn compile_page(c: &mut Criterion) {
    let source = r#"
        <x-layout::default title="Products">
            <template #navbar>
                <nav><a href="/">Home</a><a href="/shop">Shop</a></nav>
            </template>
            <template>
                @description("All products")
                <ul>
                    <li :foreach="$products as $product">
                        <x-product.card name="{{ $product.name }}" price="{{ $product.price }}" />
                    </li>
                </ul>
                <p :if="count($products) === 0">No products yet.</p>
                <p :else>{{ count($products) }} products</p>
            </template>
        </x-layout::default>
    "#;
    let compiler = Compiler::new();

    c.bench_function("compile_page", |b| {
        b.iter(|| compiler.compile(black_box(source)))
    });
}

criterion_group!(benches, compile_page);
criterion_main!(benches);
