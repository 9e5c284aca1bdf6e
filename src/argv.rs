//! Argv/Env Packer (C10, §4.6, §8 scenarios 1-2). Packs a list of strings
//! into the two contiguous buffers `args_get`/`environ_get` expect: a flat
//! NUL-terminated byte blob, and the pointers into it that `args_get`
//! itself writes out. Environment entries are pre-formatted as
//! `KEY=VALUE\0` before being handed here — this module only knows about
//! flat NUL-terminated strings, not about the `=` convention.

/// A packed string table: `len(strings)+1`-counted as `count`, with `blob`
/// holding each string followed by a single NUL, back to back.
#[derive(Debug, Clone, Default)]
pub struct PackedStrings {
    pub blob: Vec<u8>,
    pub offsets: Vec<u32>,
}

impl PackedStrings {
    pub fn pack<S: AsRef<str>>(strings: &[S]) -> Self {
        let mut blob = Vec::new();
        let mut offsets = Vec::with_capacity(strings.len());
        for s in strings {
            offsets.push(blob.len() as u32);
            blob.extend_from_slice(s.as_ref().as_bytes());
            blob.push(0);
        }
        Self { blob, offsets }
    }

    pub fn count(&self) -> u32 {
        self.offsets.len() as u32
    }

    pub fn buf_size(&self) -> u32 {
        self.blob.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_round_trip_matches_scenario_one() {
        let packed = PackedStrings::pack(&["testApp", "arg1", "arg22", "arg333"]);
        assert_eq!(packed.count(), 4);
        assert_eq!(packed.buf_size(), 8 + 5 + 6 + 7);
        assert_eq!(packed.blob, b"testApp\0arg1\0arg22\0arg333\0");
    }

    #[test]
    fn env_round_trip_matches_scenario_two() {
        let packed = PackedStrings::pack(&["var1=value1", "var2=value2"]);
        assert_eq!(packed.count(), 2);
        assert_eq!(packed.buf_size(), 26);
        assert_eq!(packed.blob, b"var1=value1\0var2=value2\0");
    }

    #[test]
    fn empty_list_packs_to_nothing() {
        let packed = PackedStrings::pack::<&str>(&[]);
        assert_eq!(packed.count(), 0);
        assert_eq!(packed.buf_size(), 0);
    }
}
