#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

/// Generate a `{System}Button` enum, a per-player joypad state struct, and a
/// combined inputs struct for a machine's controller ports. Used by every
/// backend crate (genesis-core, smsgg-core) instead of hand-writing the same
/// boilerplate per system.
#[macro_export]
macro_rules! define_controller_inputs {
    (
        buttons: $button_enum:ident {
            $($button:ident -> $button_field:ident),* $(,)?
        }
        $(, non_gamepad_buttons: [$($non_gamepad_button:ident),* $(,)?])?
        , joypad: $joypad_struct:ident
        $(
            , inputs: $inputs_struct:ident {
                players: {
                    $($player_field:ident: Player::$player_value:ident),* $(,)?
                }
                $(, buttons: [$($ex_button:ident -> $ex_button_field:ident),* $(,)?])?
                $(,)?
            }
        )?
        $(,)?
    ) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, ::std::hash::Hash,
            ::bincode::Encode, ::bincode::Decode,
            ::mc_macros::EnumAll, ::mc_macros::EnumDisplay, ::mc_macros::EnumFromStr,
        )]
        pub enum $button_enum {
            $($button,)*
            $($($non_gamepad_button,)*)?
        }

        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Default, ::std::hash::Hash,
            ::bincode::Encode, ::bincode::Decode,
        )]
        pub struct $joypad_struct {
            $(pub $button_field: bool,)*
        }

        impl $joypad_struct {
            #[inline]
            pub fn set_button(&mut self, button: $button_enum, pressed: bool) {
                match button {
                    $($button_enum::$button => self.$button_field = pressed,)*
                    $($($button_enum::$non_gamepad_button => {})*)?
                }
            }
        }

        $(
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, Default, ::std::hash::Hash,
                ::bincode::Encode, ::bincode::Decode,
            )]
            pub struct $inputs_struct {
                $(pub $player_field: $joypad_struct,)*
                $($(pub $ex_button_field: bool,)*)?
            }

            impl $crate::frontend::MappableInputs<$button_enum> for $inputs_struct {
                #[inline]
                fn set_field(&mut self, button: $button_enum, player: $crate::input::Player, pressed: bool) {
                    match (button, player) {
                        $($((
                            $button_enum::$ex_button, _) => { self.$ex_button_field = pressed; }
                        )*)?
                        $((button, $crate::input::Player::$player_value) => {
                            self.$player_field.set_button(button, pressed);
                        })*
                    }
                }
            }
        )?
    }
}

pub use define_controller_inputs;
