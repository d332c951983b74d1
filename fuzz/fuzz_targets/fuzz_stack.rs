#![no_main]

use libfuzzer_sys::fuzz_target;

use tagstack::{LocalStack, PoolConfig};

// The first byte picks the pool limit; every following byte is an operation: values below 0x80
// are pushed, the rest pop.
fuzz_target!(|data: &[u8]| {
    let Some((&limit, ops)) = data.split_first() else {
        return;
    };
    let limit = usize::from(limit % 32);

    let config = PoolConfig::new().with_chunk_len(3).with_max_nodes(limit);
    let mut stack = LocalStack::with_config(config).unwrap();
    let mut model = Vec::new();

    for &op in ops {
        if op < 0x80 {
            if model.len() < limit {
                assert_eq!(stack.push(op), Ok(()));
                model.push(op);
            } else {
                assert_eq!(stack.push(op), Err(op));
            }
        } else {
            assert_eq!(stack.pop(), model.pop());
        }
        assert_eq!(stack.len(), model.len());
    }

    assert!(stack.pool().capacity() <= limit);
});
