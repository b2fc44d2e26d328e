//! Key decoding for legacy VT sequences and the Kitty keyboard protocol.
//!
//! Both directions go through one parse step: [`decode`] turns raw input into candidate
//! [`KeyId`]s, and [`KeyId::parse`] turns a canonical identifier such as `ctrl+shift+up` into
//! the same structure, so [`matches_key`] and [`parse_key`] can never disagree.

use std::fmt;

const MOD_SHIFT: u8 = 1;
const MOD_ALT: u8 = 2;
const MOD_CTRL: u8 = 4;
const KNOWN_MODS: u16 = (MOD_SHIFT | MOD_ALT | MOD_CTRL) as u16;
const LOCK_MASK: u16 = 64 + 128;

const CODEPOINT_TAB: u32 = 9;
const CODEPOINT_ENTER: u32 = 13;
const CODEPOINT_ESCAPE: u32 = 27;
const CODEPOINT_SPACE: u32 = 32;
const CODEPOINT_BACKSPACE: u32 = 127;
const CODEPOINT_KP_ENTER: u32 = 57414;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Tab,
    Enter,
    Space,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    /// Function key `F1`..`F12`.
    F(u8),
    /// Lowercase latin letter.
    Char(char),
}

impl Key {
    fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "escape" | "esc" => Key::Escape,
            "tab" => Key::Tab,
            "enter" | "return" => Key::Enter,
            "space" => Key::Space,
            "backspace" => Key::Backspace,
            "delete" => Key::Delete,
            "insert" => Key::Insert,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" => Key::PageUp,
            "pagedown" => Key::PageDown,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            _ => {
                if let Some(number) = name.strip_prefix('f') {
                    let number = number.parse::<u8>().ok()?;
                    return (1..=12).contains(&number).then_some(Key::F(number));
                }
                let mut chars = name.chars();
                let ch = chars.next()?;
                if chars.next().is_some() || !ch.is_ascii_lowercase() {
                    return None;
                }
                Key::Char(ch)
            }
        };
        Some(key)
    }

    /// Key for a Kitty / modifyOtherKeys codepoint.
    fn from_codepoint(codepoint: u32) -> Option<Self> {
        match codepoint {
            CODEPOINT_ESCAPE => Some(Key::Escape),
            CODEPOINT_TAB => Some(Key::Tab),
            CODEPOINT_ENTER | CODEPOINT_KP_ENTER => Some(Key::Enter),
            CODEPOINT_SPACE => Some(Key::Space),
            CODEPOINT_BACKSPACE => Some(Key::Backspace),
            97..=122 => char::from_u32(codepoint).map(Key::Char),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Key::Escape => "escape",
            Key::Tab => "tab",
            Key::Enter => "enter",
            Key::Space => "space",
            Key::Backspace => "backspace",
            Key::Delete => "delete",
            Key::Insert => "insert",
            Key::Home => "home",
            Key::End => "end",
            Key::PageUp => "pageup",
            Key::PageDown => "pagedown",
            Key::Up => "up",
            Key::Down => "down",
            Key::Left => "left",
            Key::Right => "right",
            Key::F(number) => return write!(f, "f{number}"),
            Key::Char(ch) => return write!(f, "{ch}"),
        };
        f.write_str(name)
    }
}

/// Shift/alt/ctrl bit set, using the Kitty bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(MOD_SHIFT);
    pub const ALT: Self = Self(MOD_ALT);
    pub const CTRL: Self = Self(MOD_CTRL);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Convert a reported modifier field (already minus one) into known modifiers.
    ///
    /// Lock bits are ignored. Super, hyper and meta have no canonical spelling, so a report
    /// carrying them yields `None`.
    fn from_reported(bits: u16) -> Option<Self> {
        let bits = bits & !LOCK_MASK;
        if bits & !KNOWN_MODS != 0 {
            return None;
        }
        Some(Self(bits as u8))
    }
}

/// A key plus its modifiers, e.g. `ctrl+shift+up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyId {
    pub const fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub const fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Parse `[shift+][ctrl+][alt+]key`. Prefixes may appear in any order; matching is
    /// case-insensitive.
    pub fn parse(id: &str) -> Option<Self> {
        let lowered = id.trim().to_ascii_lowercase();
        let mut parts: Vec<&str> = lowered.split('+').collect();
        let name = parts.pop()?;
        let key = Key::from_name(name)?;

        let mut modifiers = Modifiers::NONE;
        for part in parts {
            let modifier = match part {
                "shift" => Modifiers::SHIFT,
                "ctrl" => Modifiers::CTRL,
                "alt" => Modifiers::ALT,
                _ => return None,
            };
            modifiers = modifiers.union(modifier);
        }
        Some(Self { key, modifiers })
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(Modifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        if self.modifiers.contains(Modifiers::CTRL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(Modifiers::ALT) {
            f.write_str("alt+")?;
        }
        write!(f, "{}", self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventType {
    Press,
    Repeat,
    Release,
}

const fn entry(seq: &'static str, key: Key, modifiers: Modifiers) -> (&'static str, KeyId) {
    (seq, KeyId::new(key, modifiers))
}

/// Fixed byte sequences sent by legacy terminals. A sequence may appear on several rows;
/// rows are listed most canonical first.
pub const LEGACY_SEQUENCES: &[(&str, KeyId)] = &[
    entry("\x1b", Key::Escape, Modifiers::NONE),
    entry("\t", Key::Tab, Modifiers::NONE),
    entry("\t", Key::Char('i'), Modifiers::CTRL),
    entry("\r", Key::Enter, Modifiers::NONE),
    entry("\r", Key::Char('m'), Modifiers::CTRL),
    entry("\n", Key::Enter, Modifiers::NONE),
    entry("\n", Key::Char('j'), Modifiers::CTRL),
    entry("\x1bOM", Key::Enter, Modifiers::NONE),
    entry("\x7f", Key::Backspace, Modifiers::NONE),
    entry("\x08", Key::Backspace, Modifiers::NONE),
    entry("\x08", Key::Char('h'), Modifiers::CTRL),
    entry("\x00", Key::Space, Modifiers::CTRL),
    entry(" ", Key::Space, Modifiers::NONE),
    entry("\x1b[Z", Key::Tab, Modifiers::SHIFT),
    entry("\x1b\r", Key::Enter, Modifiers::ALT),
    entry("\x1b ", Key::Space, Modifiers::ALT),
    entry("\x1b\x7f", Key::Backspace, Modifiers::ALT),
    entry("\x1b\x08", Key::Backspace, Modifiers::ALT),
    entry("\x1b[A", Key::Up, Modifiers::NONE),
    entry("\x1b[B", Key::Down, Modifiers::NONE),
    entry("\x1b[C", Key::Right, Modifiers::NONE),
    entry("\x1b[D", Key::Left, Modifiers::NONE),
    entry("\x1bOA", Key::Up, Modifiers::NONE),
    entry("\x1bOB", Key::Down, Modifiers::NONE),
    entry("\x1bOC", Key::Right, Modifiers::NONE),
    entry("\x1bOD", Key::Left, Modifiers::NONE),
    entry("\x1b[H", Key::Home, Modifiers::NONE),
    entry("\x1bOH", Key::Home, Modifiers::NONE),
    entry("\x1b[F", Key::End, Modifiers::NONE),
    entry("\x1bOF", Key::End, Modifiers::NONE),
    entry("\x1b[a", Key::Up, Modifiers::SHIFT),
    entry("\x1b[b", Key::Down, Modifiers::SHIFT),
    entry("\x1b[c", Key::Right, Modifiers::SHIFT),
    entry("\x1b[d", Key::Left, Modifiers::SHIFT),
    entry("\x1bOa", Key::Up, Modifiers::CTRL),
    entry("\x1bOb", Key::Down, Modifiers::CTRL),
    entry("\x1bOc", Key::Right, Modifiers::CTRL),
    entry("\x1bOd", Key::Left, Modifiers::CTRL),
    entry("\x1b[2$", Key::Insert, Modifiers::SHIFT),
    entry("\x1b[3$", Key::Delete, Modifiers::SHIFT),
    entry("\x1b[5$", Key::PageUp, Modifiers::SHIFT),
    entry("\x1b[6$", Key::PageDown, Modifiers::SHIFT),
    entry("\x1b[7$", Key::Home, Modifiers::SHIFT),
    entry("\x1b[8$", Key::End, Modifiers::SHIFT),
    entry("\x1b[2^", Key::Insert, Modifiers::CTRL),
    entry("\x1b[3^", Key::Delete, Modifiers::CTRL),
    entry("\x1b[5^", Key::PageUp, Modifiers::CTRL),
    entry("\x1b[6^", Key::PageDown, Modifiers::CTRL),
    entry("\x1b[7^", Key::Home, Modifiers::CTRL),
    entry("\x1b[8^", Key::End, Modifiers::CTRL),
    entry("\x1b[[5~", Key::PageUp, Modifiers::NONE),
    entry("\x1b[[6~", Key::PageDown, Modifiers::NONE),
    entry("\x1bOP", Key::F(1), Modifiers::NONE),
    entry("\x1bOQ", Key::F(2), Modifiers::NONE),
    entry("\x1bOR", Key::F(3), Modifiers::NONE),
    entry("\x1bOS", Key::F(4), Modifiers::NONE),
    entry("\x1b[[A", Key::F(1), Modifiers::NONE),
    entry("\x1b[[B", Key::F(2), Modifiers::NONE),
    entry("\x1b[[C", Key::F(3), Modifiers::NONE),
    entry("\x1b[[D", Key::F(4), Modifiers::NONE),
    entry("\x1b[[E", Key::F(5), Modifiers::NONE),
    entry("\x1bb", Key::Left, Modifiers::ALT),
    entry("\x1bf", Key::Right, Modifiers::ALT),
    entry("\x1bp", Key::Up, Modifiers::ALT),
    entry("\x1bn", Key::Down, Modifiers::ALT),
];

fn tilde_key(number: u32) -> Option<Key> {
    let key = match number {
        1 | 7 => Key::Home,
        2 => Key::Insert,
        3 => Key::Delete,
        4 | 8 => Key::End,
        5 => Key::PageUp,
        6 => Key::PageDown,
        11..=15 => Key::F((number - 10) as u8),
        17..=21 => Key::F((number - 11) as u8),
        23 | 24 => Key::F((number - 12) as u8),
        _ => return None,
    };
    Some(key)
}

fn letter_final_key(final_byte: char) -> Option<Key> {
    let key = match final_byte {
        'A' => Key::Up,
        'B' => Key::Down,
        'C' => Key::Right,
        'D' => Key::Left,
        'H' => Key::Home,
        'F' => Key::End,
        'P' => Key::F(1),
        'Q' => Key::F(2),
        'R' => Key::F(3),
        'S' => Key::F(4),
        _ => return None,
    };
    Some(key)
}

/// Split `ESC [ params final` where params only hold digits, `;` and `:`.
fn split_csi(data: &str) -> Option<(&str, char)> {
    let body = data.strip_prefix("\x1b[")?;
    let final_byte = body.chars().last()?;
    let params = &body[..body.len() - final_byte.len_utf8()];
    if !params
        .bytes()
        .all(|b| b.is_ascii_digit() || b == b';' || b == b':')
    {
        return None;
    }
    Some((params, final_byte))
}

/// Parse a `mod[:event]` field into raw modifier bits (reported value minus one).
fn parse_modifier_field(field: Option<&str>) -> Option<(u16, KeyEventType)> {
    let Some(field) = field else {
        return Some((0, KeyEventType::Press));
    };
    let (value, event) = match field.split_once(':') {
        Some((value, event)) => (value, Some(event)),
        None => (field, None),
    };
    let reported = if value.is_empty() {
        1
    } else {
        value.parse::<u16>().ok()?
    };
    let event = match event.and_then(|event| event.parse::<u8>().ok()) {
        Some(2) => KeyEventType::Repeat,
        Some(3) => KeyEventType::Release,
        _ => KeyEventType::Press,
    };
    Some((reported.saturating_sub(1), event))
}

fn decode_kitty(params: &str, out: &mut Vec<KeyId>) -> Option<()> {
    let mut fields = params.split(';');
    let key_field = fields.next()?;
    let (bits, _) = parse_modifier_field(fields.next())?;
    if fields.next().is_some() {
        return None;
    }
    let modifiers = Modifiers::from_reported(bits)?;

    let mut codes = key_field.split(':');
    let codepoint = codes.next()?.parse::<u32>().ok()?;
    let _shifted = codes.next();
    let base_layout = codes.next().and_then(|value| value.parse::<u32>().ok());

    if let Some(key) = Key::from_codepoint(codepoint) {
        out.push(KeyId::new(key, modifiers));
        return Some(());
    }
    // Non-latin layouts report the base-layout key so shortcuts keep working.
    if codepoint >= 128 {
        if let Some(key) = base_layout.and_then(Key::from_codepoint) {
            out.push(KeyId::new(key, modifiers));
        }
    }
    Some(())
}

fn decode_tilde(params: &str, out: &mut Vec<KeyId>) -> Option<()> {
    let fields: Vec<&str> = params.split(';').collect();
    let number = fields.first()?.parse::<u32>().ok()?;

    if number == 27 && fields.len() == 3 {
        // xterm modifyOtherKeys: CSI 27 ; mod ; code ~
        let (bits, _) = parse_modifier_field(Some(fields[1]))?;
        let modifiers = Modifiers::from_reported(bits)?;
        let code = fields[2].parse::<u32>().ok()?;
        out.push(KeyId::new(Key::from_codepoint(code)?, modifiers));
        return Some(());
    }

    if fields.len() > 2 {
        return None;
    }
    let (bits, _) = parse_modifier_field(fields.get(1).copied())?;
    let modifiers = Modifiers::from_reported(bits)?;
    out.push(KeyId::new(tilde_key(number)?, modifiers));
    Some(())
}

fn decode_letter_final(params: &str, final_byte: char, out: &mut Vec<KeyId>) -> Option<()> {
    let key = letter_final_key(final_byte)?;
    if params.is_empty() {
        out.push(KeyId::plain(key));
        return Some(());
    }
    let (number, field) = params.split_once(';')?;
    if number != "1" {
        return None;
    }
    let (bits, _) = parse_modifier_field(Some(field))?;
    out.push(KeyId::new(key, Modifiers::from_reported(bits)?));
    Some(())
}

fn push_unique(out: &mut Vec<KeyId>, id: KeyId) {
    if !out.contains(&id) {
        out.push(id);
    }
}

/// Every key identifier `data` can stand for, most canonical first.
///
/// Returns an empty vector for input that is not a recognised key.
pub fn decode(data: &str) -> Vec<KeyId> {
    let mut out = Vec::new();

    if let Some((params, final_byte)) = split_csi(data) {
        let _ = match final_byte {
            'u' => decode_kitty(params, &mut out),
            '~' => decode_tilde(params, &mut out),
            _ => decode_letter_final(params, final_byte, &mut out),
        };
    }

    for (sequence, id) in LEGACY_SEQUENCES {
        if *sequence == data {
            push_unique(&mut out, *id);
        }
    }

    let bytes = data.as_bytes();
    if bytes.len() == 1 {
        match bytes[0] {
            code @ 0x01..=0x1a => {
                let letter = char::from(b'a' + code - 1);
                push_unique(&mut out, KeyId::new(Key::Char(letter), Modifiers::CTRL));
            }
            code @ b'a'..=b'z' => push_unique(&mut out, KeyId::plain(Key::Char(char::from(code)))),
            _ => {}
        }
    }

    out
}

/// Does `data` encode the key named by `key_id`?
pub fn matches_key(data: &str, key_id: &str) -> bool {
    let Some(expected) = KeyId::parse(key_id) else {
        return false;
    };
    decode(data).contains(&expected)
}

/// Canonical identifier for `data`, if it is a recognised key.
pub fn parse_key(data: &str) -> Option<String> {
    decode(data).first().map(KeyId::to_string)
}

/// Kitty event type carried by `data`; anything without one is a press.
pub fn key_event_type(data: &str) -> KeyEventType {
    if data.starts_with("\x1b[200~") {
        return KeyEventType::Press;
    }
    let Some((params, _)) = split_csi(data) else {
        return KeyEventType::Press;
    };
    params
        .split(';')
        .nth(1)
        .and_then(|field| parse_modifier_field(Some(field)))
        .map_or(KeyEventType::Press, |(_, event)| event)
}

pub fn is_key_release(data: &str) -> bool {
    key_event_type(data) == KeyEventType::Release
}

pub fn is_key_repeat(data: &str) -> bool {
    key_event_type(data) == KeyEventType::Repeat
}

#[cfg(test)]
mod tests {
    use super::{
        decode, is_key_release, is_key_repeat, matches_key, parse_key, Key, KeyId, Modifiers,
    };

    #[test]
    fn key_ids_parse_and_print_canonically() {
        let id = KeyId::parse("Alt+Ctrl+Shift+Up").unwrap();
        assert_eq!(id.key, Key::Up);
        assert_eq!(id.to_string(), "shift+ctrl+alt+up");
        assert_eq!(KeyId::parse("esc").unwrap().to_string(), "escape");
        assert_eq!(KeyId::parse("pageUp").unwrap().to_string(), "pageup");
        assert!(KeyId::parse("super+a").is_none());
        assert!(KeyId::parse("ctrl+").is_none());
        assert!(KeyId::parse("f13").is_none());
    }

    #[test]
    fn control_bytes_decode_with_aliases() {
        assert_eq!(parse_key("\x03"), Some("ctrl+c".to_string()));
        assert_eq!(parse_key("\t"), Some("tab".to_string()));
        assert!(matches_key("\t", "ctrl+i"));
        assert_eq!(parse_key("\x08"), Some("backspace".to_string()));
        assert!(matches_key("\x08", "ctrl+h"));
        assert_eq!(parse_key("\x00"), Some("ctrl+space".to_string()));
    }

    #[test]
    fn modified_arrows_and_tilde_keys() {
        assert_eq!(parse_key("\x1b[1;5A"), Some("ctrl+up".to_string()));
        assert_eq!(parse_key("\x1b[1;2D"), Some("shift+left".to_string()));
        assert_eq!(parse_key("\x1b[3;3~"), Some("alt+delete".to_string()));
        assert_eq!(parse_key("\x1b[15~"), Some("f5".to_string()));
        assert_eq!(parse_key("\x1b[1;2P"), Some("shift+f1".to_string()));
    }

    #[test]
    fn kitty_letters_and_lock_bits() {
        assert_eq!(parse_key("\x1b[97;5u"), Some("ctrl+a".to_string()));
        // caps lock (64) reported on top of ctrl
        assert_eq!(parse_key("\x1b[97;69u"), Some("ctrl+a".to_string()));
        assert_eq!(parse_key("\x1b[13;2u"), Some("shift+enter".to_string()));
        assert!(matches_key("\x1b[57414u", "enter"));
    }

    #[test]
    fn super_modifier_is_not_a_match() {
        assert_eq!(parse_key("\x1b[97;9u"), None);
        assert!(!matches_key("\x1b[97;9u", "a"));
    }

    #[test]
    fn base_layout_fallback_for_non_latin_only() {
        assert_eq!(parse_key("\x1b[1089::99;5u"), Some("ctrl+c".to_string()));
        assert_eq!(parse_key("\x1b[99::118;5u"), Some("ctrl+c".to_string()));
    }

    #[test]
    fn modify_other_keys() {
        assert!(matches_key("\x1b[27;2;13~", "shift+enter"));
        assert!(matches_key("\x1b[27;5;97~", "ctrl+a"));
    }

    #[test]
    fn legacy_letters_need_kitty_for_shift_and_alt() {
        assert_eq!(parse_key("A"), None);
        assert_eq!(parse_key("\x1ba"), None);
        assert!(!matches_key("a", "shift+a"));
        assert!(matches_key("\x1b[97;2u", "shift+a"));
    }

    #[test]
    fn unknown_input_is_none() {
        assert_eq!(parse_key("\x1b[999~"), None);
        assert_eq!(parse_key("hello"), None);
        assert!(decode("").is_empty());
        assert!(!matches_key("x", "not-a-key"));
    }

    #[test]
    fn event_types() {
        assert!(is_key_release("\x1b[97;1:3u"));
        assert!(is_key_repeat("\x1b[1;1:2A"));
        assert!(!is_key_release("\x1b[97u"));
        assert!(!is_key_release("\x1b[200~90;1:3u\x1b[201~"));
        assert_eq!(
            decode("\x1b[97;1:3u"),
            vec![KeyId::new(Key::Char('a'), Modifiers::NONE)]
        );
    }
}
