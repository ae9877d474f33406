// Bit access helpers for registers stored as arrays of 32 bit words.  This
// file is compiled into the library and also copied into generated modules
// which need it, so it may only use `core`.

/// Returns the bit at position `bit`.
pub fn get1(r: &[u32], bit: u32) -> bool {
    r[(bit / 32) as usize] & (1 << (bit % 32)) != 0
}

/// Sets or clears the bit at position `bit`.
pub fn set1(r: &mut [u32], bit: u32, v: bool) {
    let w = &mut r[(bit / 32) as usize];
    if v {
        *w |= 1 << (bit % 32);
    } else {
        *w &= !(1 << (bit % 32));
    }
}

/// Returns bits `lo` through `hi`, inclusive.  At most 64 bits can be read.
pub fn get_range(r: &[u32], lo: u32, hi: u32) -> u64 {
    let mut v = 0u64;
    let mut bit = lo;
    while bit <= hi {
        let shift = bit % 32;
        let take = (32 - shift).min(hi - bit + 1);
        let word = (r[(bit / 32) as usize] >> shift) as u64 & ((1u64 << take) - 1);
        v |= word << (bit - lo);
        bit += take;
    }
    v
}

/// Replaces bits `lo` through `hi`, inclusive, with the low bits of `v`.
pub fn set_range(r: &mut [u32], lo: u32, hi: u32, v: u64) {
    let mut bit = lo;
    while bit <= hi {
        let shift = bit % 32;
        let take = (32 - shift).min(hi - bit + 1);
        let mask = (((1u64 << take) - 1) as u32) << shift;
        let part = ((v >> (bit - lo)) as u32) << shift;
        let w = &mut r[(bit / 32) as usize];
        *w = (*w & !mask) | (part & mask);
        bit += take;
    }
}

/// Returns bits `lo` through `hi` as words, the lowest bits first.
pub fn get_words<const N: usize>(r: &[u32], lo: u32, hi: u32) -> [u32; N] {
    let mut out = [0u32; N];
    let mut bit = lo;
    let mut i = 0;
    while bit <= hi {
        let top = (bit + 31).min(hi);
        out[i] = get_range(r, bit, top) as u32;
        bit = top + 1;
        i += 1;
    }
    out
}

/// Replaces bits `lo` through `hi` with the words of `v`, the lowest bits first.
pub fn set_words(r: &mut [u32], lo: u32, hi: u32, v: &[u32]) {
    let mut bit = lo;
    let mut i = 0;
    while bit <= hi {
        let top = (bit + 31).min(hi);
        set_range(r, bit, top, v[i] as u64);
        bit = top + 1;
        i += 1;
    }
}
