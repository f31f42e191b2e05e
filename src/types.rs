// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Small value types shared by every layer of the engine: squares, ranks, files, colors,
//! piece kinds and castling rights.
use num_traits::{FromPrimitive, ToPrimitive};
use std::convert::TryFrom;
use std::fmt::{self, Display, Write};

use crate::attacks;
use crate::bitboard::Bitboard;

// TableIndex is implemented for every enum that is used to index one of the engine's
// lookup tables. Anything that derives To and FromPrimitive gets it for free.
pub trait TableIndex {
    fn as_index(self) -> usize;
    fn from_index(idx: usize) -> Self;
}

impl<T> TableIndex for T
where
    T: FromPrimitive + ToPrimitive,
{
    fn as_index(self) -> usize {
        self.to_usize().unwrap()
    }

    fn from_index(idx: usize) -> T {
        <T as FromPrimitive>::from_usize(idx).unwrap()
    }
}

/// A square on the board, numbered rank-major from a1 (0) to h8 (63).
#[rustfmt::skip]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum Square {
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

impl Square {
    pub fn of(rank: Rank, file: File) -> Square {
        Square::from_index(rank.as_index() * 8 + file.as_index())
    }

    pub fn rank(self) -> Rank {
        Rank::from_index(self as usize >> 3)
    }

    pub fn file(self) -> File {
        File::from_index(self as usize & 7)
    }

    /// The square `offset` steps away in index space, or `None` if that falls off the
    /// board. Callers are responsible for file wraparound.
    pub fn offset(self, offset: i32) -> Option<Square> {
        let idx = self as i32 + offset;
        if idx < 0 || idx > 63 {
            return None;
        }

        Some(Square::from_index(idx as usize))
    }

    /// This square seen from the given side, so that white's tables can be reused for black.
    pub fn relative_to(self, color: Color) -> Square {
        match color {
            Color::White => self,
            Color::Black => Square::from_index(self as usize ^ 56),
        }
    }

    /// Iterates over every square, a1 first.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square::from_index)
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

impl TryFrom<&str> for Square {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut chars = value.chars();
        let file = File::try_from(chars.next().ok_or(())?)?;
        let rank = Rank::try_from(chars.next().ok_or(())?)?;
        if chars.next().is_some() {
            return Err(());
        }

        Ok(Square::of(rank, file))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, FromPrimitive, ToPrimitive)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

impl Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char((b'1' + *self as u8) as char)
    }
}

impl TryFrom<char> for Rank {
    type Error = ();

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            '1'..='8' => Ok(Rank::from_index(value as usize - '1' as usize)),
            _ => Err(()),
        }
    }
}

pub static RANKS: [Rank; 8] = [
    Rank::One,
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, FromPrimitive, ToPrimitive)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl Display for File {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char((b'a' + *self as u8) as char)
    }
}

impl TryFrom<char> for File {
    type Error = ();

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'a'..='h' => Ok(File::from_index(value as usize - 'a' as usize)),
            _ => Err(()),
        }
    }
}

pub static FILES: [File; 8] = [
    File::A,
    File::B,
    File::C,
    File::D,
    File::E,
    File::F,
    File::G,
    File::H,
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn toggle(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Index offset of a single pawn push for this color.
    pub fn pawn_push(self) -> i32 {
        match self {
            Color::White => 8,
            Color::Black => -8,
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let chr = match self {
            Color::White => 'w',
            Color::Black => 'b',
        };
        f.write_char(chr)
    }
}

pub static COLORS: [Color; 2] = [Color::White, Color::Black];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub fn as_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

impl Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char(self.as_char())
    }
}

impl TryFrom<char> for PieceKind {
    type Error = ();

    fn try_from(value: char) -> Result<Self, Self::Error> {
        let kind = match value.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return Err(()),
        };
        Ok(kind)
    }
}

pub static PIECE_KINDS: [PieceKind; 6] = [
    PieceKind::Pawn,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Rook,
    PieceKind::Queen,
    PieceKind::King,
];

/// The pieces a pawn may promote to, strongest first so that move ordering sees queen
/// promotions before underpromotions.
pub static PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

bitflags! {
    /// The four castling rights. The raw bits double as an index into the 16 castling
    /// hash keys.
    pub struct CastleStatus: u8 {
        const NONE = 0;
        const WHITE_KINGSIDE = 0b0000_0001;
        const WHITE_QUEENSIDE = 0b0000_0010;
        const WHITE = Self::WHITE_KINGSIDE.bits | Self::WHITE_QUEENSIDE.bits;
        const BLACK_KINGSIDE = 0b0000_0100;
        const BLACK_QUEENSIDE = 0b0000_1000;
        const BLACK = Self::BLACK_KINGSIDE.bits | Self::BLACK_QUEENSIDE.bits;
    }
}

impl CastleStatus {
    pub fn kingside(color: Color) -> CastleStatus {
        match color {
            Color::White => CastleStatus::WHITE_KINGSIDE,
            Color::Black => CastleStatus::BLACK_KINGSIDE,
        }
    }

    pub fn queenside(color: Color) -> CastleStatus {
        match color {
            Color::White => CastleStatus::WHITE_QUEENSIDE,
            Color::Black => CastleStatus::BLACK_QUEENSIDE,
        }
    }

    pub fn both(color: Color) -> CastleStatus {
        match color {
            Color::White => CastleStatus::WHITE,
            Color::Black => CastleStatus::BLACK,
        }
    }

    /// Rights that survive a move touching `square`: moving from or capturing on a king or
    /// rook home square revokes the matching rights.
    pub fn revoked_by(square: Square) -> CastleStatus {
        match square {
            Square::E1 => CastleStatus::WHITE,
            Square::H1 => CastleStatus::WHITE_KINGSIDE,
            Square::A1 => CastleStatus::WHITE_QUEENSIDE,
            Square::E8 => CastleStatus::BLACK,
            Square::H8 => CastleStatus::BLACK_KINGSIDE,
            Square::A8 => CastleStatus::BLACK_QUEENSIDE,
            _ => CastleStatus::NONE,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color) -> Piece {
        Piece { kind, color }
    }

    pub fn attacks(&self, sq: Square, occupancy: Bitboard) -> Bitboard {
        match self.kind {
            PieceKind::Pawn => attacks::pawn_attacks(sq, self.color),
            PieceKind::Knight => attacks::knight_attacks(sq),
            PieceKind::Bishop => attacks::bishop_attacks(sq, occupancy),
            PieceKind::Rook => attacks::rook_attacks(sq, occupancy),
            PieceKind::Queen => attacks::queen_attacks(sq, occupancy),
            PieceKind::King => attacks::king_attacks(sq),
        }
    }
}

impl TryFrom<char> for Piece {
    type Error = ();

    fn try_from(c: char) -> Result<Self, Self::Error> {
        let kind = PieceKind::try_from(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Ok(Piece::new(kind, color))
    }
}

impl Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let chr = self.kind.as_char();
        match self.color {
            Color::White => f.write_char(chr.to_ascii_uppercase()),
            Color::Black => f.write_char(chr),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::*;

    #[test]
    fn square_rank_and_file() {
        assert_eq!(Rank::Four, Square::E4.rank());
        assert_eq!(File::E, Square::E4.file());
        assert_eq!(Square::C6, Square::of(Rank::Six, File::C));
    }

    #[test]
    fn square_display_and_parse() {
        assert_eq!("g7", Square::G7.to_string());
        assert_eq!(Ok(Square::G7), Square::try_from("g7"));
        assert!(Square::try_from("i7").is_err());
        assert!(Square::try_from("g77").is_err());
    }

    #[test]
    fn square_offset_bounds() {
        assert_eq!(Some(Square::A2), Square::A1.offset(8));
        assert_eq!(None, Square::A1.offset(-8));
        assert_eq!(None, Square::H8.offset(1));
    }

    #[test]
    fn relative_squares() {
        assert_eq!(Square::E2, Square::E2.relative_to(Color::White));
        assert_eq!(Square::E7, Square::E2.relative_to(Color::Black));
    }

    #[test]
    fn piece_chars() {
        let piece = Piece::try_from('N').unwrap();
        assert_eq!(PieceKind::Knight, piece.kind);
        assert_eq!(Color::White, piece.color);
        assert_eq!("q", Piece::new(PieceKind::Queen, Color::Black).to_string());
        assert!(Piece::try_from('x').is_err());
    }

    #[test]
    fn castle_revocation() {
        assert_eq!(CastleStatus::WHITE, CastleStatus::revoked_by(Square::E1));
        assert_eq!(
            CastleStatus::BLACK_QUEENSIDE,
            CastleStatus::revoked_by(Square::A8)
        );
        assert_eq!(CastleStatus::NONE, CastleStatus::revoked_by(Square::D4));
    }
}
