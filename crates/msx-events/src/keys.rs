/// Key codes, scancodes and modifier masks.
///
/// Numbering follows SDL2 so platform backends can pass raw values through
/// unchanged: printable keys use their ASCII value, all other keys are the
/// scancode with `SCANCODE_MASK` set.
use bitflags::bitflags;

/// Bit that marks a keycode as derived from a scancode.
pub const SCANCODE_MASK: i32 = 1 << 30;

/// Physical key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyCode(pub i32);

const fn from_scancode(sc: i32) -> KeyCode {
    KeyCode(sc | SCANCODE_MASK)
}

impl KeyCode {
    pub const UNKNOWN: KeyCode = KeyCode(0);
    pub const BACKSPACE: KeyCode = KeyCode(8);
    pub const TAB: KeyCode = KeyCode(9);
    pub const RETURN: KeyCode = KeyCode(13);
    pub const ESCAPE: KeyCode = KeyCode(27);
    pub const SPACE: KeyCode = KeyCode(32);
    pub const QUOTE: KeyCode = KeyCode(39);
    pub const COMMA: KeyCode = KeyCode(44);
    pub const MINUS: KeyCode = KeyCode(45);
    pub const PERIOD: KeyCode = KeyCode(46);
    pub const SLASH: KeyCode = KeyCode(47);
    pub const NUM_0: KeyCode = KeyCode(48);
    pub const NUM_1: KeyCode = KeyCode(49);
    pub const NUM_2: KeyCode = KeyCode(50);
    pub const NUM_3: KeyCode = KeyCode(51);
    pub const NUM_4: KeyCode = KeyCode(52);
    pub const NUM_5: KeyCode = KeyCode(53);
    pub const NUM_6: KeyCode = KeyCode(54);
    pub const NUM_7: KeyCode = KeyCode(55);
    pub const NUM_8: KeyCode = KeyCode(56);
    pub const NUM_9: KeyCode = KeyCode(57);
    pub const SEMICOLON: KeyCode = KeyCode(59);
    pub const EQUALS: KeyCode = KeyCode(61);
    pub const LEFTBRACKET: KeyCode = KeyCode(91);
    pub const BACKSLASH: KeyCode = KeyCode(92);
    pub const RIGHTBRACKET: KeyCode = KeyCode(93);
    pub const BACKQUOTE: KeyCode = KeyCode(96);
    pub const A: KeyCode = KeyCode(97);
    pub const B: KeyCode = KeyCode(98);
    pub const Z: KeyCode = KeyCode(122);
    pub const DELETE: KeyCode = KeyCode(127);

    pub const RIGHT: KeyCode = from_scancode(79);
    pub const LEFT: KeyCode = from_scancode(80);
    pub const DOWN: KeyCode = from_scancode(81);
    pub const UP: KeyCode = from_scancode(82);
    pub const KP_ENTER: KeyCode = from_scancode(88);
    pub const LCTRL: KeyCode = from_scancode(224);
    pub const LSHIFT: KeyCode = from_scancode(225);
    pub const LALT: KeyCode = from_scancode(226);
    pub const LGUI: KeyCode = from_scancode(227);
    pub const RCTRL: KeyCode = from_scancode(228);
    pub const RSHIFT: KeyCode = from_scancode(229);
    pub const RALT: KeyCode = from_scancode(230);
    pub const RGUI: KeyCode = from_scancode(231);
    pub const MODE: KeyCode = from_scancode(257);

    /// Letter key for an ASCII lowercase letter.
    pub fn letter(c: char) -> Option<KeyCode> {
        c.is_ascii_lowercase().then(|| KeyCode(c as i32))
    }

    /// Digit key for an ASCII digit.
    pub fn digit(c: char) -> Option<KeyCode> {
        c.is_ascii_digit().then(|| KeyCode(c as i32))
    }

    /// Key code with the scancode-namespace bit cleared.
    pub fn masked(self) -> i32 {
        self.0 & !SCANCODE_MASK
    }

    /// Whether this key is a pure modifier (ctrl, shift, alt, gui, mode).
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            KeyCode::LCTRL
                | KeyCode::LSHIFT
                | KeyCode::LALT
                | KeyCode::LGUI
                | KeyCode::RCTRL
                | KeyCode::RSHIFT
                | KeyCode::RALT
                | KeyCode::RGUI
                | KeyCode::MODE
        )
    }

    /// The scancode a US layout reports for this key.
    ///
    /// Used when synthesizing key events that have no physical origin.
    pub fn default_scancode(self) -> Scancode {
        if self.0 & SCANCODE_MASK != 0 {
            return Scancode(self.masked() as u16);
        }
        let code = match self.0 {
            c @ 97..=122 => 4 + (c - 97),
            c @ 49..=57 => 30 + (c - 49),
            48 => 39,
            13 => 40,
            27 => 41,
            8 => 42,
            9 => 43,
            32 => 44,
            45 => 45,
            61 => 46,
            91 => 47,
            93 => 48,
            92 => 49,
            59 => 51,
            39 => 52,
            96 => 53,
            44 => 54,
            46 => 55,
            47 => 56,
            127 => 76,
            _ => 0,
        };
        Scancode(code as u16)
    }
}

/// Physical scancode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Scancode(pub u16);

impl Scancode {
    pub const UNKNOWN: Scancode = Scancode(0);
    pub const RETURN: Scancode = Scancode(40);
    pub const ESCAPE: Scancode = Scancode(41);
    pub const TAB: Scancode = Scancode(43);
    pub const SPACE: Scancode = Scancode(44);
    pub const RIGHT: Scancode = Scancode(79);
    pub const LEFT: Scancode = Scancode(80);
    pub const DOWN: Scancode = Scancode(81);
    pub const UP: Scancode = Scancode(82);
}

bitflags! {
    /// Keyboard modifier mask (SDL `KMOD_*` layout).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const LSHIFT = 0x0001;
        const RSHIFT = 0x0002;
        const LCTRL = 0x0040;
        const RCTRL = 0x0080;
        const LALT = 0x0100;
        const RALT = 0x0200;
        const LGUI = 0x0400;
        const RGUI = 0x0800;
        const NUM = 0x1000;
        const CAPS = 0x2000;
        const MODE = 0x4000;

        const SHIFT = Self::LSHIFT.bits() | Self::RSHIFT.bits();
        const CTRL = Self::LCTRL.bits() | Self::RCTRL.bits();
        const ALT = Self::LALT.bits() | Self::RALT.bits();
        const GUI = Self::LGUI.bits() | Self::RGUI.bits();
    }
}

/// Clear the modifier mask on pure modifier keys.
///
/// Platforms report e.g. LSHIFT-down with the SHIFT modifier already set,
/// which the MSX keyboard matrix would see as a second shift press.
pub fn normalize_modifiers(key: KeyCode, modifiers: Modifiers) -> Modifiers {
    if key.is_modifier() {
        Modifiers::empty()
    } else {
        modifiers
    }
}
