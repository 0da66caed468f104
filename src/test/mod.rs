//! Interface graphs shared by unit tests.
//!
//! Every fixture returns a [`MemoryClassSource`] holding a small, self-contained graph built
//! with [`InterfaceBuilder`].

use crate::classfile::{InterfaceBuilder, MemoryClassSource};

fn add(source: &mut MemoryClassSource, builder: InterfaceBuilder, name: &str) {
    source.insert(name, builder.build().unwrap());
}

/// `NamedShape extends Shape, Named`, plus a static factory on `Shape`.
pub fn named_shape() -> MemoryClassSource {
    let mut source = MemoryClassSource::new();
    add(
        &mut source,
        InterfaceBuilder::new("demo/Shape")
            .method("area", "()D")
            .static_method("unit", "()Ldemo/Shape;"),
        "demo/Shape",
    );
    add(
        &mut source,
        InterfaceBuilder::new("demo/Named").method("name", "()Ljava/lang/String;"),
        "demo/Named",
    );
    add(
        &mut source,
        InterfaceBuilder::new("demo/NamedShape")
            .extends("demo/Shape")
            .extends("demo/Named"),
        "demo/NamedShape",
    );
    source
}

/// `D extends B, C`; `B extends A`; `C extends A`; `A` declares `r()V`.
pub fn diamond() -> MemoryClassSource {
    let mut source = MemoryClassSource::new();
    add(&mut source, InterfaceBuilder::new("demo/A").method("r", "()V"), "demo/A");
    add(
        &mut source,
        InterfaceBuilder::new("demo/B").extends("demo/A").method("b", "(I)I"),
        "demo/B",
    );
    add(
        &mut source,
        InterfaceBuilder::new("demo/C").extends("demo/A").method("r", "()V"),
        "demo/C",
    );
    add(
        &mut source,
        InterfaceBuilder::new("demo/D").extends("demo/B").extends("demo/C"),
        "demo/D",
    );
    source
}

/// `Sub extends Base<String>` narrowing `T m(T)` to `String m(String)`.
pub fn covariant_generic() -> MemoryClassSource {
    let mut source = MemoryClassSource::new();
    add(
        &mut source,
        InterfaceBuilder::new("demo/Base")
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .generic_method("m", "(Ljava/lang/Object;)Ljava/lang/Object;", "(TT;)TT;"),
        "demo/Base",
    );
    add(
        &mut source,
        InterfaceBuilder::new("demo/Sub")
            .extends("demo/Base")
            .signature("Ljava/lang/Object;Ldemo/Base<Ljava/lang/String;>;")
            .method("m", "(Ljava/lang/String;)Ljava/lang/String;"),
        "demo/Sub",
    );
    source
}

/// `Both extends Left<String>, Right<Integer>`, each declaring `void accept(T)`.
pub fn conflicting_generics() -> MemoryClassSource {
    let mut source = MemoryClassSource::new();
    for name in ["demo/Left", "demo/Right"] {
        add(
            &mut source,
            InterfaceBuilder::new(name)
                .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
                .generic_method("accept", "(Ljava/lang/Object;)V", "(TT;)V"),
            name,
        );
    }
    add(
        &mut source,
        InterfaceBuilder::new("demo/Both")
            .extends("demo/Left")
            .extends("demo/Right")
            .signature(
                "Ljava/lang/Object;Ldemo/Left<Ljava/lang/String;>;Ldemo/Right<Ljava/lang/Integer;>;",
            ),
        "demo/Both",
    );
    source
}
