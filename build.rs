#![deny(warnings)]

use std::{env, error::Error};

fn main() -> Result<(), Box<dyn Error>> {
    let target = env::var("TARGET")?;
    let arch = env::var("CARGO_CFG_TARGET_ARCH")?;

    println!("cargo::rustc-check-cfg=cfg(has_dwcas)");

    // Set some cfg's depending on the target.
    // - has_dwcas: a compare-and-swap twice the pointer width is available. `SharedStack` and
    //   `SharedPool` need it for the version-tagged head. On x86_64 without the `cmpxchg16b`
    //   target feature portable-atomic picks the instruction at run time (its `fallback`
    //   feature); every other target listed here has it at compile time. Targets that could
    //   only ever get portable-atomic's lock are left out.
    let has_dwcas = match &arch[..] {
        "x86_64" | "aarch64" | "arm64ec" | "s390x" => true,
        "powerpc64" => target.starts_with("powerpc64le-"),
        // cmpxchg8b
        "x86" => !target.starts_with("i386-"),
        // ldrexd / strexd exist on ARMv6K and later A/R profiles but not on M profile cores
        "arm" => !target.starts_with("thumb") && !target.starts_with("armv5"),
        _ => false,
    };

    if has_dwcas {
        println!("cargo::rustc-cfg=has_dwcas");
    }

    Ok(())
}
