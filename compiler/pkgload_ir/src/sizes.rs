//! Target size and alignment rules.
//!
//! The checker needs concrete sizes to lay out type declarations and to
//! range-check integer constants. Rules are selected by the compiler and
//! architecture identifiers carried in the [`BuildContext`](crate::BuildContext).

use crate::package::BasicKind;

/// Word size and maximum alignment for one target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sizes {
    /// Size of `int`, `uint`, `uintptr` and pointers, in bytes.
    pub word_size: u64,
    /// Largest alignment any type can require, in bytes.
    pub max_align: u64,
}

/// Word size per architecture.
const ARCH_WORDS: &[(&str, u64)] = &[
    ("x86", 4),
    ("x86_64", 8),
    ("arm", 4),
    ("aarch64", 8),
    ("riscv32", 4),
    ("riscv64", 8),
    ("mips", 4),
    ("mips64", 8),
    ("powerpc64", 8),
    ("s390x", 8),
    ("wasm32", 4),
    ("wasm64", 8),
];

impl Default for Sizes {
    /// The 64-bit layout, used when the target is not recognized.
    fn default() -> Self {
        Sizes {
            word_size: 8,
            max_align: 8,
        }
    }
}

impl Sizes {
    /// Look up the rules for a compiler/architecture pair.
    ///
    /// Known compilers are `"std"` (natural alignment, capped at the word
    /// size) and `"packed"` (alignment capped at 4 bytes).
    pub fn for_target(compiler: &str, arch: &str) -> Option<Sizes> {
        let word_size = ARCH_WORDS
            .iter()
            .find(|(name, _)| *name == arch)
            .map(|&(_, word)| word)?;

        let max_align = match compiler {
            "std" => word_size,
            "packed" => word_size.min(4),
            _ => return None,
        };

        Some(Sizes {
            word_size,
            max_align,
        })
    }

    /// Like [`Sizes::for_target`], falling back to the default layout.
    pub fn for_target_or_default(compiler: &str, arch: &str) -> Sizes {
        Self::for_target(compiler, arch).unwrap_or_else(|| {
            tracing::debug!(compiler, arch, "unknown target, using default sizes");
            Sizes::default()
        })
    }

    /// Size of a basic type.
    pub fn basic_size(&self, kind: BasicKind) -> u64 {
        match kind {
            BasicKind::Bool | BasicKind::Byte => 1,
            BasicKind::Int | BasicKind::Uint | BasicKind::Uintptr => self.word_size,
            BasicKind::Float => 8,
            BasicKind::String => self.string_size(),
            // Untyped constants have no runtime representation.
            BasicKind::UntypedInt
            | BasicKind::UntypedFloat
            | BasicKind::UntypedString
            | BasicKind::UntypedBool => 0,
        }
    }

    /// Size of a pointer (and of opaque foreign handles).
    #[inline]
    pub fn pointer_size(&self) -> u64 {
        self.word_size
    }

    /// A string is a data pointer plus a length.
    #[inline]
    pub fn string_size(&self) -> u64 {
        2 * self.word_size
    }

    /// A slice is a data pointer, a length and a capacity.
    #[inline]
    pub fn slice_size(&self) -> u64 {
        3 * self.word_size
    }

    /// Alignment of a scalar of the given size.
    pub fn align_of_scalar(&self, size: u64) -> u64 {
        size.clamp(1, self.max_align)
    }

    /// Lay out struct fields in declaration order.
    ///
    /// Takes `(size, align)` per field and returns `(size, align)` of the
    /// struct. An empty struct has size 0 and alignment 1.
    pub fn struct_layout(&self, fields: &[(u64, u64)]) -> (u64, u64) {
        let mut offset = 0u64;
        let mut align = 1u64;
        for &(field_size, field_align) in fields {
            let field_align = field_align.clamp(1, self.max_align);
            offset = round_up(offset, field_align) + field_size;
            align = align.max(field_align);
        }
        (round_up(offset, align), align)
    }

    /// Inclusive bounds of a sized integer kind on this target.
    ///
    /// Returns `None` for kinds that are not integers.
    pub fn int_bounds(&self, kind: BasicKind) -> Option<(i128, i128)> {
        let bits = u32::try_from(self.word_size * 8).unwrap_or(64);
        match kind {
            BasicKind::Int => Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)),
            BasicKind::Uint | BasicKind::Uintptr => Some((0, (1i128 << bits) - 1)),
            BasicKind::Byte => Some((0, 255)),
            _ => None,
        }
    }
}

fn round_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}
