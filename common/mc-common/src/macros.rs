/// Define a two-valued hardware flag enum (e.g. a single control-register bit)
/// instead of a bare `bool`, so call sites read as `Vram` / `Cram` rather than
/// `true` / `false`.
#[macro_export]
macro_rules! define_bit_enum {
    ($name:ident, [$zero:ident, $one:ident]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ::bincode::Encode, ::bincode::Decode)]
        pub enum $name {
            #[default]
            $zero = 0,
            $one = 1,
        }

        impl $name {
            pub fn from_bit(bit: bool) -> Self {
                if bit { Self::$one } else { Self::$zero }
            }
        }
    };
}
