// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `moves` module defines `Move`, a move packed into a single 32-bit word.
//!
//! ## Encoding
//!
//! | Bits  | Field                                        |
//! |-------|----------------------------------------------|
//! | 0-5   | source square                                |
//! | 6-11  | destination square                           |
//! | 12    | set if white is the side making the move     |
//! | 13-15 | kind of the moving piece                     |
//! | 16-18 | promotion piece kind, or 6 for no promotion  |
//! | 19    | capture                                      |
//! | 20    | double pawn push                             |
//! | 21    | en passant capture                           |
//! | 22    | castle (king's source and destination)       |
//! | 23    | gives check                                  |
//!
//! The all-zero word is the null move. Every real move has a promotion field of at least
//! 1, so it can never collide with the null move.
//!
//! The check bit isn't known when a move is first generated; the legality filter in the
//! move generator sets it after trying the move out.
use std::fmt;

use crate::types::{Color, PieceKind, Square, TableIndex};

const SOURCE_SHIFT: u32 = 0;
const DESTINATION_SHIFT: u32 = 6;
const WHITE_SHIFT: u32 = 12;
const PIECE_SHIFT: u32 = 13;
const PROMOTION_SHIFT: u32 = 16;
const SQUARE_MASK: u32 = 0x3F;
const KIND_MASK: u32 = 0x7;
const NO_PROMOTION: u32 = 6;

/// Bits of a packed move that identify the move itself, as opposed to annotations.
pub const MOVE_IDENTITY_MASK: u32 = (1 << 23) - 1;

bitflags! {
    pub struct MoveFlags: u32 {
        const NONE = 0;
        const CAPTURE = 1 << 19;
        const DOUBLE_PUSH = 1 << 20;
        const EN_PASSANT = 1 << 21;
        const CASTLE = 1 << 22;
        const CHECK = 1 << 23;
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Move(u32);

impl Move {
    /// Packs a move from its parts.
    pub fn new(
        source: Square,
        dest: Square,
        side: Color,
        piece: PieceKind,
        promotion: Option<PieceKind>,
        flags: MoveFlags,
    ) -> Move {
        debug_assert!(source != dest, "a move must change squares");
        debug_assert!(
            promotion.map_or(true, |kind| kind != PieceKind::Pawn && kind != PieceKind::King),
            "invalid promotion piece"
        );
        let white = if side == Color::White { 1 } else { 0 };
        let promo = promotion.map_or(NO_PROMOTION, |kind| kind.as_index() as u32);
        Move(
            ((source as u32) << SOURCE_SHIFT)
                | ((dest as u32) << DESTINATION_SHIFT)
                | (white << WHITE_SHIFT)
                | ((piece.as_index() as u32) << PIECE_SHIFT)
                | (promo << PROMOTION_SHIFT)
                | flags.bits(),
        )
    }

    pub const fn null() -> Move {
        Move(0)
    }

    pub const fn from_bits(bits: u32) -> Move {
        Move(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn quiet(source: Square, dest: Square, side: Color, piece: PieceKind) -> Move {
        Move::new(source, dest, side, piece, None, MoveFlags::NONE)
    }

    pub fn capture(source: Square, dest: Square, side: Color, piece: PieceKind) -> Move {
        Move::new(source, dest, side, piece, None, MoveFlags::CAPTURE)
    }

    pub fn double_pawn_push(source: Square, dest: Square, side: Color) -> Move {
        Move::new(
            source,
            dest,
            side,
            PieceKind::Pawn,
            None,
            MoveFlags::DOUBLE_PUSH,
        )
    }

    pub fn en_passant(source: Square, dest: Square, side: Color) -> Move {
        Move::new(
            source,
            dest,
            side,
            PieceKind::Pawn,
            None,
            MoveFlags::CAPTURE | MoveFlags::EN_PASSANT,
        )
    }

    pub fn promotion(source: Square, dest: Square, side: Color, promoted: PieceKind) -> Move {
        Move::new(
            source,
            dest,
            side,
            PieceKind::Pawn,
            Some(promoted),
            MoveFlags::NONE,
        )
    }

    pub fn promotion_capture(
        source: Square,
        dest: Square,
        side: Color,
        promoted: PieceKind,
    ) -> Move {
        Move::new(
            source,
            dest,
            side,
            PieceKind::Pawn,
            Some(promoted),
            MoveFlags::CAPTURE,
        )
    }

    /// A castle, encoded by the king's source and destination squares.
    pub fn castle(source: Square, dest: Square, side: Color) -> Move {
        Move::new(
            source,
            dest,
            side,
            PieceKind::King,
            None,
            MoveFlags::CASTLE,
        )
    }

    /// This move, annotated as giving check.
    pub fn with_check(self) -> Move {
        Move(self.0 | MoveFlags::CHECK.bits())
    }

    pub fn source(self) -> Square {
        Square::from_index(((self.0 >> SOURCE_SHIFT) & SQUARE_MASK) as usize)
    }

    pub fn destination(self) -> Square {
        Square::from_index(((self.0 >> DESTINATION_SHIFT) & SQUARE_MASK) as usize)
    }

    pub fn side(self) -> Color {
        if (self.0 >> WHITE_SHIFT) & 1 != 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    /// The kind of piece being moved.
    pub fn piece(self) -> PieceKind {
        let raw = ((self.0 >> PIECE_SHIFT) & KIND_MASK) as usize;
        debug_assert!(raw < 6, "move {:#x} encodes an unmovable piece", self.0);
        PieceKind::from_index(raw)
    }

    pub fn promotion_piece(self) -> Option<PieceKind> {
        let raw = (self.0 >> PROMOTION_SHIFT) & KIND_MASK;
        if raw == NO_PROMOTION {
            return None;
        }

        debug_assert!(
            raw >= 1 && raw <= 4,
            "move {:#x} encodes an invalid promotion",
            self.0
        );
        Some(PieceKind::from_index(raw as usize))
    }

    pub fn flags(self) -> MoveFlags {
        MoveFlags::from_bits_truncate(self.0)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn is_capture(self) -> bool {
        self.flags().contains(MoveFlags::CAPTURE)
    }

    pub fn is_double_pawn_push(self) -> bool {
        self.flags().contains(MoveFlags::DOUBLE_PUSH)
    }

    pub fn is_en_passant(self) -> bool {
        self.flags().contains(MoveFlags::EN_PASSANT)
    }

    pub fn is_castle(self) -> bool {
        self.flags().contains(MoveFlags::CASTLE)
    }

    pub fn is_kingside_castle(self) -> bool {
        self.is_castle() && self.destination() > self.source()
    }

    pub fn is_queenside_castle(self) -> bool {
        self.is_castle() && self.destination() < self.source()
    }

    pub fn is_promotion(self) -> bool {
        self.promotion_piece().is_some()
    }

    pub fn gives_check(self) -> bool {
        self.flags().contains(MoveFlags::CHECK)
    }

    /// Neither a capture nor a promotion.
    pub fn is_quiet(self) -> bool {
        !self.is_capture() && !self.is_promotion()
    }

    /// Compares the moves while ignoring annotations such as the check bit.
    pub fn same_action(self, other: Move) -> bool {
        (self.0 & MOVE_IDENTITY_MASK) == (other.0 & MOVE_IDENTITY_MASK)
    }

    /// The move in UCI's long algebraic notation, e.g. `e2e4` or `e7e8q`.
    pub fn as_uci(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_null() {
            return write!(f, "0000");
        }

        write!(f, "{}{}", self.source(), self.destination())?;
        if let Some(kind) = self.promotion_piece() {
            write!(f, "{}", kind)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_null() {
            return write!(f, "Move(null)");
        }

        write!(
            f,
            "Move({} {:?} {:?} {:?})",
            self,
            self.side(),
            self.piece(),
            self.flags()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Move, MoveFlags};
    use crate::types::{Color, PieceKind, Square, COLORS, PIECE_KINDS, PROMOTION_KINDS};

    #[test]
    fn quiet() {
        let mov = Move::quiet(Square::G1, Square::F3, Color::White, PieceKind::Knight);
        assert_eq!(Square::G1, mov.source());
        assert_eq!(Square::F3, mov.destination());
        assert_eq!(Color::White, mov.side());
        assert_eq!(PieceKind::Knight, mov.piece());
        assert!(mov.is_quiet());
        assert!(!mov.is_null());
        assert_eq!(None, mov.promotion_piece());
    }

    #[test]
    fn capture() {
        let mov = Move::capture(Square::B4, Square::C5, Color::Black, PieceKind::Bishop);
        assert!(mov.is_capture());
        assert!(!mov.is_quiet());
        assert_eq!(Color::Black, mov.side());
    }

    #[test]
    fn en_passant() {
        let mov = Move::en_passant(Square::E5, Square::D6, Color::White);
        assert!(mov.is_en_passant());
        assert!(mov.is_capture());
        assert_eq!(PieceKind::Pawn, mov.piece());
    }

    #[test]
    fn double_pawn_push() {
        let mov = Move::double_pawn_push(Square::D7, Square::D5, Color::Black);
        assert!(mov.is_double_pawn_push());
        assert!(!mov.is_capture());
        assert!(mov.is_quiet());
    }

    #[test]
    fn promotions() {
        for &kind in PROMOTION_KINDS.iter() {
            let promo = Move::promotion(Square::A7, Square::A8, Color::White, kind);
            assert_eq!(Some(kind), promo.promotion_piece());
            assert!(!promo.is_capture());
            assert!(!promo.is_quiet());

            let capture = Move::promotion_capture(Square::B2, Square::A1, Color::Black, kind);
            assert_eq!(Some(kind), capture.promotion_piece());
            assert!(capture.is_capture());
        }
    }

    #[test]
    fn castles() {
        let kingside = Move::castle(Square::E1, Square::G1, Color::White);
        assert!(kingside.is_castle());
        assert!(kingside.is_kingside_castle());
        assert!(!kingside.is_queenside_castle());

        let queenside = Move::castle(Square::E8, Square::C8, Color::Black);
        assert!(queenside.is_queenside_castle());
        assert!(!queenside.is_kingside_castle());
    }

    #[test]
    fn check_annotation() {
        let mov = Move::quiet(Square::D1, Square::H5, Color::White, PieceKind::Queen);
        let checking = mov.with_check();
        assert!(checking.gives_check());
        assert!(!mov.gives_check());
        assert_ne!(mov, checking);
        assert!(mov.same_action(checking));
    }

    #[test]
    fn null_move() {
        assert!(Move::null().is_null());
        assert_eq!("0000", Move::null().as_uci());
        assert_eq!(Move::null(), Move::default());
    }

    #[test]
    fn uci_strings() {
        let mov = Move::quiet(Square::E2, Square::E4, Color::White, PieceKind::Pawn);
        assert_eq!("e2e4", mov.as_uci());
        let promo = Move::promotion(Square::E7, Square::E8, Color::White, PieceKind::Knight);
        assert_eq!("e7e8n", promo.as_uci());
        let castle = Move::castle(Square::E1, Square::G1, Color::White);
        assert_eq!("e1g1", castle.as_uci());
    }

    #[test]
    fn decode_encode_round_trip() {
        let flag_sets = [
            MoveFlags::NONE,
            MoveFlags::CAPTURE,
            MoveFlags::DOUBLE_PUSH,
            MoveFlags::CAPTURE | MoveFlags::EN_PASSANT,
            MoveFlags::CASTLE,
            MoveFlags::CAPTURE | MoveFlags::CHECK,
            MoveFlags::CHECK,
        ];
        let squares = [(Square::A1, Square::H8), (Square::E2, Square::E4), (Square::H7, Square::G8)];
        let promotions = [
            None,
            Some(PieceKind::Knight),
            Some(PieceKind::Bishop),
            Some(PieceKind::Rook),
            Some(PieceKind::Queen),
        ];

        for &(from, to) in squares.iter() {
            for &side in COLORS.iter() {
                for &piece in PIECE_KINDS.iter() {
                    for &promotion in promotions.iter() {
                        for &flags in flag_sets.iter() {
                            let mov = Move::new(from, to, side, piece, promotion, flags);
                            let decoded = Move::new(
                                mov.source(),
                                mov.destination(),
                                mov.side(),
                                mov.piece(),
                                mov.promotion_piece(),
                                mov.flags(),
                            );
                            assert_eq!(mov.bits(), decoded.bits());
                            assert_eq!(mov, Move::from_bits(mov.bits()));
                        }
                    }
                }
            }
        }
    }
}
