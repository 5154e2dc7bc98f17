mod config;
mod encode;
mod enums;
mod partialclone;

use proc_macro::TokenStream;

/// Implement `std::fmt::Display` for an enum with only fieldless variants.
///
/// Also generates `to_str(&self) -> &'static str` for cases where an owned
/// `String` isn't needed.
#[proc_macro_derive(EnumDisplay)]
pub fn enum_display(input: TokenStream) -> TokenStream {
    enums::enum_display(input)
}

/// Implement `std::str::FromStr` (case-insensitively) for an enum with only
/// fieldless variants, with `Err` set to `String`.
#[proc_macro_derive(EnumFromStr)]
pub fn enum_from_str(input: TokenStream) -> TokenStream {
    enums::enum_from_str(input)
}

/// Add an `ALL: [Self; N]` associated constant listing every variant of a
/// fieldless enum in declaration order.
#[proc_macro_derive(EnumAll)]
pub fn enum_all(input: TokenStream) -> TokenStream {
    enums::enum_all(input)
}

/// Implement `clap::ValueEnum` using the enum's own variant names (via
/// `EnumAll`/`EnumDisplay`) instead of clap's kebab-case defaults.
#[proc_macro_derive(CustomValueEnum)]
pub fn custom_value_enum(input: TokenStream) -> TokenStream {
    enums::custom_value_enum(input)
}

/// Implement `std::fmt::Display` for a struct, printing one `field: value`
/// line per field. `#[cfg_display(debug_fmt)]` formats a field with `Debug`
/// instead of `Display`; `#[cfg_display(indent_nested)]` indents a nested
/// `ConfigDisplay` value; `#[cfg_display(skip)]` omits a field;
/// `#[cfg_display(path)]` formats a `PathBuf`/`Path` field via `.display()`.
#[proc_macro_derive(
    ConfigDisplay,
    attributes(debug_fmt, indent_nested, cfg_display_skip, cfg_display_path, cfg_display)
)]
pub fn config_display(input: TokenStream) -> TokenStream {
    config::config_display(input)
}

/// Implement `bincode::Encode` with a no-op body that always succeeds.
/// Used for large buffers (e.g. ROM images) that should never be persisted
/// in a save state.
#[proc_macro_derive(FakeEncode)]
pub fn fake_encode(input: TokenStream) -> TokenStream {
    encode::fake_encode(input)
}

/// Implement `bincode::Decode`/`BorrowDecode` that decode nothing and return
/// `Self::default()`. Pairs with `FakeEncode`.
#[proc_macro_derive(FakeDecode)]
pub fn fake_decode(input: TokenStream) -> TokenStream {
    encode::fake_decode(input)
}

/// Implement `mc_common::frontend::PartialClone`. Fields tagged
/// `#[partial_clone(default)]` are reset to `Default::default()` in the
/// clone; fields tagged `#[partial_clone(partial)]` recurse through
/// `PartialClone` instead of `Clone`.
#[proc_macro_derive(PartialClone, attributes(partial_clone))]
pub fn partial_clone(input: TokenStream) -> TokenStream {
    partialclone::partial_clone(input)
}
