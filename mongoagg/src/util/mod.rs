// The unchecked version unwraps insertions. This should only be used for
// building member maps in tests.
#[cfg(test)]
#[macro_export]
macro_rules! unchecked_unique_linked_hash_map {
	($($key:expr => $val:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut out = mongoagg_datastructures::UniqueLinkedHashMap::new();
        $(
            out.insert($key, $val).unwrap();
        )*
        out
	}};
}
