// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::convert::TryFrom;
use std::error::Error;
use std::fmt;

use crate::attacks;
use crate::bitboard::{Bitboard, BB_RANK_1, BB_RANK_3, BB_RANK_6, BB_RANK_8};
use crate::move_generator::{MoveGenerator, MoveVec};
use crate::moves::Move;
use crate::types::TableIndex;
use crate::types::{CastleStatus, Color, File, Piece, PieceKind, Rank, Square};
use crate::types::{FILES, PIECE_KINDS, RANKS};
use crate::zobrist;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Possible errors that can arise when parsing a FEN string into a `Position`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FenParseError {
    UnexpectedChar(char),
    UnexpectedEnd,
    InvalidDigit,
    FileDoesNotSumToEight,
    UnknownPiece,
    InvalidSideToMove,
    InvalidCastle,
    InvalidEnPassant,
    PawnOnBackRank,
    EmptyHalfmove,
    InvalidHalfmove,
    EmptyFullmove,
    InvalidFullmove,
    MissingKing(Color),
}

impl fmt::Display for FenParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FenParseError::UnexpectedChar(c) => write!(f, "unexpected character '{}'", c),
            FenParseError::UnexpectedEnd => write!(f, "unexpected end of input"),
            FenParseError::InvalidDigit => write!(f, "empty-square count out of range"),
            FenParseError::FileDoesNotSumToEight => write!(f, "rank does not sum to eight files"),
            FenParseError::UnknownPiece => write!(f, "unknown piece"),
            FenParseError::InvalidSideToMove => write!(f, "invalid side to move"),
            FenParseError::InvalidCastle => write!(f, "invalid castling rights"),
            FenParseError::InvalidEnPassant => write!(f, "invalid en-passant square"),
            FenParseError::PawnOnBackRank => write!(f, "pawn on the first or eighth rank"),
            FenParseError::EmptyHalfmove => write!(f, "missing halfmove clock"),
            FenParseError::InvalidHalfmove => write!(f, "invalid halfmove clock"),
            FenParseError::EmptyFullmove => write!(f, "missing fullmove counter"),
            FenParseError::InvalidFullmove => write!(f, "invalid fullmove counter"),
            FenParseError::MissingKing(color) => {
                write!(f, "side {} does not have exactly one king", color)
            }
        }
    }
}

impl Error for FenParseError {}

/// Errors produced when turning UCI move text into a `Move`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveParseError {
    /// The text isn't of the form `<from><to>[promotion]`.
    Malformed(String),
    /// The text is well-formed but names no legal move in the position.
    NotLegal(String),
}

impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MoveParseError::Malformed(text) => write!(f, "malformed move '{}'", text),
            MoveParseError::NotLegal(text) => write!(f, "'{}' is not a legal move", text),
        }
    }
}

impl Error for MoveParseError {}

/// A chess position. Positions are small plain values: applying a move produces a new
/// `Position` and leaves the old one untouched, so a position can be shared freely between
/// search threads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    boards_by_kind: [Bitboard; 6],
    boards_by_color: [Bitboard; 2],
    en_passant: Bitboard,
    halfmove_clock: u32,
    fullmove_clock: u32,
    side_to_move: Color,
    castle_status: CastleStatus,
    zobrist_hash: u64,
}

//
// Board state getters
//

impl Position {
    pub const fn new() -> Position {
        Position {
            boards_by_kind: [Bitboard::none(); 6],
            boards_by_color: [Bitboard::none(); 2],
            en_passant: Bitboard::none(),
            halfmove_clock: 0,
            fullmove_clock: 1,
            side_to_move: Color::White,
            castle_status: CastleStatus::NONE,
            zobrist_hash: 0,
        }
    }

    pub fn en_passant_square(&self) -> Option<Square> {
        self.en_passant.first()
    }

    /// The en-passant target as a mask with zero or one bits set.
    pub fn en_passant_mask(&self) -> Bitboard {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_clock(&self) -> u32 {
        self.fullmove_clock
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn zobrist_hash(&self) -> u64 {
        self.zobrist_hash
    }

    pub fn castle_status(&self) -> CastleStatus {
        self.castle_status
    }

    pub fn can_castle_kingside(&self, color: Color) -> bool {
        self.castle_status.contains(CastleStatus::kingside(color))
    }

    pub fn can_castle_queenside(&self, color: Color) -> bool {
        self.castle_status.contains(CastleStatus::queenside(color))
    }

    pub fn pieces(&self, color: Color) -> Bitboard {
        self.boards_by_color[color.as_index()]
    }

    pub fn occupied(&self) -> Bitboard {
        self.boards_by_color[0] | self.boards_by_color[1]
    }

    /// Pieces of the given kind, of both colors.
    pub fn all_of_kind(&self, kind: PieceKind) -> Bitboard {
        self.boards_by_kind[kind.as_index()]
    }

    pub fn pieces_of_kind(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.boards_by_kind[kind.as_index()] & self.boards_by_color[color.as_index()]
    }

    pub fn pawns(&self, color: Color) -> Bitboard {
        self.pieces_of_kind(color, PieceKind::Pawn)
    }

    pub fn knights(&self, color: Color) -> Bitboard {
        self.pieces_of_kind(color, PieceKind::Knight)
    }

    pub fn bishops(&self, color: Color) -> Bitboard {
        self.pieces_of_kind(color, PieceKind::Bishop)
    }

    pub fn rooks(&self, color: Color) -> Bitboard {
        self.pieces_of_kind(color, PieceKind::Rook)
    }

    pub fn queens(&self, color: Color) -> Bitboard {
        self.pieces_of_kind(color, PieceKind::Queen)
    }

    pub fn kings(&self, color: Color) -> Bitboard {
        self.pieces_of_kind(color, PieceKind::King)
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.kings(color).first()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        let color = if self.boards_by_color[Color::White.as_index()].test(square) {
            Color::White
        } else if self.boards_by_color[Color::Black.as_index()].test(square) {
            Color::Black
        } else {
            return None;
        };

        for &kind in &PIECE_KINDS {
            if self.boards_by_kind[kind.as_index()].test(square) {
                return Some(Piece::new(kind, color));
            }
        }

        // If we get here, we failed to update a bitboard somewhere.
        unreachable!("square {} has a color but no piece kind", square)
    }

    /// True if the side has anything besides pawns and its king. Null-move pruning is
    /// unsound without it (zugzwang).
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        let minors_and_majors = self.boards_by_kind[PieceKind::Knight.as_index()]
            | self.boards_by_kind[PieceKind::Bishop.as_index()]
            | self.boards_by_kind[PieceKind::Rook.as_index()]
            | self.boards_by_kind[PieceKind::Queen.as_index()];
        !(minors_and_majors & self.pieces(color)).empty()
    }

    /// Recomputes the Zobrist hash from scratch. Always equal to `zobrist_hash()`.
    pub fn compute_hash(&self) -> u64 {
        zobrist::hash(self)
    }
}

//
// Move application
//

impl Position {
    /// Adds or removes a piece: every board involved, and the hash, are updated by XOR.
    fn toggle_piece(&mut self, square: Square, piece: Piece) {
        let mask = Bitboard::from_square(square);
        self.boards_by_kind[piece.kind.as_index()] ^= mask;
        self.boards_by_color[piece.color.as_index()] ^= mask;
        zobrist::modify_piece(&mut self.zobrist_hash, square, piece);
    }

    fn set_en_passant(&mut self, target: Option<Square>) {
        let old = self.en_passant_square();
        zobrist::modify_en_passant(&mut self.zobrist_hash, old, target);
        self.en_passant = target.map_or(Bitboard::none(), Bitboard::from_square);
    }

    fn set_castle_status(&mut self, status: CastleStatus) {
        zobrist::modify_castle(&mut self.zobrist_hash, self.castle_status, status);
        self.castle_status = status;
    }

    /// Returns the position reached by playing `mov`, which must be legal (or at least
    /// pseudolegal) in this position.
    pub fn apply(&self, mov: Move) -> Position {
        debug_assert!(!mov.is_null(), "use apply_null for null moves");
        debug_assert_eq!(self.side_to_move, mov.side(), "move {} for wrong side", mov);

        let mut next = *self;
        let us = self.side_to_move;
        let them = us.toggle();
        let source = mov.source();
        let dest = mov.destination();
        let moving = Piece::new(mov.piece(), us);
        debug_assert_eq!(
            Some(moving),
            self.piece_at(source),
            "move {} does not match board",
            mov
        );

        if mov.is_capture() {
            if mov.is_en_passant() {
                // The captured pawn sits behind the target square, not on it.
                let victim = Square::from_index((dest as i32 - us.pawn_push()) as usize);
                next.toggle_piece(victim, Piece::new(PieceKind::Pawn, them));
            } else {
                match self.piece_at(dest) {
                    Some(captured) => next.toggle_piece(dest, captured),
                    None => debug_assert!(false, "capture {} of an empty square", mov),
                }
            }
        }

        next.toggle_piece(source, moving);
        let landing = mov
            .promotion_piece()
            .map_or(moving, |kind| Piece::new(kind, us));
        next.toggle_piece(dest, landing);

        if mov.is_castle() {
            // Castles are encoded with the king's squares; the rook hops to the other side.
            let (rook_from, rook_to) = if mov.is_kingside_castle() {
                (dest as usize + 1, dest as usize - 1)
            } else {
                (dest as usize - 2, dest as usize + 1)
            };
            let rook = Piece::new(PieceKind::Rook, us);
            next.toggle_piece(Square::from_index(rook_from), rook);
            next.toggle_piece(Square::from_index(rook_to), rook);
        }

        let revoked = CastleStatus::revoked_by(source) | CastleStatus::revoked_by(dest);
        next.set_castle_status(self.castle_status - revoked);

        let target = if mov.is_double_pawn_push() {
            Some(Square::from_index((source as i32 + us.pawn_push()) as usize))
        } else {
            None
        };
        next.set_en_passant(target);

        if mov.is_capture() || moving.kind == PieceKind::Pawn {
            next.halfmove_clock = 0;
        } else {
            next.halfmove_clock += 1;
        }

        if us == Color::Black {
            next.fullmove_clock += 1;
        }

        next.side_to_move = them;
        zobrist::modify_side_to_move(&mut next.zobrist_hash);
        next
    }

    /// Passes the turn without moving. En passant is no longer available afterwards.
    pub fn apply_null(&self) -> Position {
        let mut next = *self;
        next.set_en_passant(None);
        next.halfmove_clock += 1;
        if self.side_to_move == Color::Black {
            next.fullmove_clock += 1;
        }

        next.side_to_move = self.side_to_move.toggle();
        zobrist::modify_side_to_move(&mut next.zobrist_hash);
        next
    }
}

//
// Board analysis
//

impl Position {
    /// Is `target` attacked by any piece of color `by`?
    pub fn is_square_attacked(&self, target: Square, by: Color) -> bool {
        self.attackers(target, by, self.occupied()).count() != 0
    }

    /// The pieces of color `by` attacking `target`, given an occupancy.
    pub fn attackers(&self, target: Square, by: Color, occupancy: Bitboard) -> Bitboard {
        let queens = self.queens(by);
        let diagonal = (self.bishops(by) | queens) & attacks::bishop_attacks(target, occupancy);
        let straight = (self.rooks(by) | queens) & attacks::rook_attacks(target, occupancy);

        // A pawn of color `by` attacks `target` exactly when a pawn of the other color on
        // `target` would attack it.
        let pawns = self.pawns(by) & attacks::pawn_attacks(target, by.toggle());
        let knights = self.knights(by) & attacks::knight_attacks(target);
        let kings = self.kings(by) & attacks::king_attacks(target);
        diagonal | straight | pawns | knights | kings
    }

    /// Is the king of `color` attacked?
    pub fn is_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(king) => self.is_square_attacked(king, color.toggle()),
            None => false,
        }
    }

    /// Is the side to move in check?
    pub fn in_check(&self) -> bool {
        self.is_check(self.side_to_move)
    }

    pub fn legal_moves(&self) -> MoveVec {
        let mut moves = MoveVec::new();
        MoveGenerator::new().legal_moves(self, &mut moves);
        moves
    }

    pub fn is_legal(&self, mov: Move) -> bool {
        self.legal_moves().iter().any(|&m| m.same_action(mov))
    }
}

//
// FEN and UCI parsing and generation.
//
// Positions can be created by parsing FEN and FEN can be produced from particular positions.
// A UCI move string only names squares, so turning one into a `Move` needs the position to
// recover the flags; we do that by matching against the legal moves.
//

impl Position {
    pub fn from_start_position() -> Position {
        match Position::from_fen(START_FEN) {
            Ok(pos) => pos,
            Err(e) => unreachable!("starting FEN failed to parse: {}", e),
        }
    }

    /// Constructs a new position from a FEN representation of a board position.
    pub fn from_fen<S: AsRef<str>>(fen: S) -> Result<Position, FenParseError> {
        use std::iter::Peekable;
        use std::str::Chars;

        type Stream<'a> = Peekable<Chars<'a>>;

        fn eat(iter: &mut Stream, expected: char) -> Result<(), FenParseError> {
            match iter.next() {
                Some(c) if c == expected => Ok(()),
                Some(c) => Err(FenParseError::UnexpectedChar(c)),
                None => Err(FenParseError::UnexpectedEnd),
            }
        }

        fn peek(iter: &mut Stream) -> Result<char, FenParseError> {
            iter.peek().cloned().ok_or(FenParseError::UnexpectedEnd)
        }

        fn eat_side_to_move(iter: &mut Stream) -> Result<Color, FenParseError> {
            let side = match peek(iter)? {
                'w' => Color::White,
                'b' => Color::Black,
                _ => return Err(FenParseError::InvalidSideToMove),
            };

            iter.next();
            Ok(side)
        }

        fn eat_castle_status(iter: &mut Stream) -> Result<CastleStatus, FenParseError> {
            if peek(iter)? == '-' {
                iter.next();
                return Ok(CastleStatus::NONE);
            }

            let mut status = CastleStatus::NONE;
            for _ in 0..4 {
                match peek(iter)? {
                    'K' => status |= CastleStatus::WHITE_KINGSIDE,
                    'k' => status |= CastleStatus::BLACK_KINGSIDE,
                    'Q' => status |= CastleStatus::WHITE_QUEENSIDE,
                    'q' => status |= CastleStatus::BLACK_QUEENSIDE,
                    ' ' => break,
                    _ => return Err(FenParseError::InvalidCastle),
                }

                iter.next();
            }

            Ok(status)
        }

        fn eat_en_passant(iter: &mut Stream, side: Color) -> Result<Bitboard, FenParseError> {
            let c = peek(iter)?;
            if c == '-' {
                iter.next();
                return Ok(Bitboard::none());
            }

            let file = File::try_from(c).map_err(|_| FenParseError::InvalidEnPassant)?;
            iter.next();
            let rank = Rank::try_from(peek(iter)?).map_err(|_| FenParseError::InvalidEnPassant)?;
            iter.next();

            // The target lies behind a pawn of the side that just moved.
            let legal_rank = match side {
                Color::White => BB_RANK_6,
                Color::Black => BB_RANK_3,
            };
            let target = Bitboard::from_square(Square::of(rank, file));
            if (target & legal_rank).empty() {
                return Err(FenParseError::InvalidEnPassant);
            }

            Ok(target)
        }

        fn eat_number(
            iter: &mut Stream,
            empty: FenParseError,
            invalid: FenParseError,
        ) -> Result<u32, FenParseError> {
            let mut buf = String::new();
            while let Some(&c) = iter.peek() {
                if !c.is_digit(10) {
                    break;
                }

                buf.push(c);
                iter.next();
            }

            if buf.is_empty() {
                return match iter.peek() {
                    None => Err(FenParseError::UnexpectedEnd),
                    Some(_) => Err(empty),
                };
            }

            buf.parse::<u32>().map_err(|_| invalid)
        }

        let mut pos = Position::new();
        let iter = &mut fen.as_ref().chars().peekable();
        for &rank in RANKS.iter().rev() {
            let mut file = File::A as usize;
            while file <= File::H as usize {
                let c = peek(iter)?;
                // digits 1 through 8 indicate empty squares.
                if c.is_digit(10) {
                    if c < '1' || c > '8' {
                        return Err(FenParseError::InvalidDigit);
                    }

                    file += c as usize - '0' as usize;
                    if file > 8 {
                        return Err(FenParseError::FileDoesNotSumToEight);
                    }

                    iter.next();
                    continue;
                }

                // if it's not a digit, it represents a piece.
                let piece = Piece::try_from(c).map_err(|_| FenParseError::UnknownPiece)?;
                pos.toggle_piece(Square::of(rank, File::from_index(file)), piece);
                iter.next();
                file += 1;
            }

            if rank != Rank::One {
                eat(iter, '/')?;
            }
        }

        if !(pos.all_of_kind(PieceKind::Pawn) & (BB_RANK_1 | BB_RANK_8)).empty() {
            return Err(FenParseError::PawnOnBackRank);
        }

        eat(iter, ' ')?;
        pos.side_to_move = eat_side_to_move(iter)?;
        eat(iter, ' ')?;
        pos.castle_status = eat_castle_status(iter)?;
        eat(iter, ' ')?;
        pos.en_passant = eat_en_passant(iter, pos.side_to_move)?;
        if let Some(target) = pos.en_passant_square() {
            // the pawn that just double-stepped must be in front of an empty target
            let them = pos.side_to_move.toggle();
            let pushed = Square::from_index((target as i32 + them.pawn_push()) as usize);
            if pos.piece_at(target).is_some()
                || pos.piece_at(pushed) != Some(Piece::new(PieceKind::Pawn, them))
            {
                return Err(FenParseError::InvalidEnPassant);
            }
        }
        eat(iter, ' ')?;
        pos.halfmove_clock = eat_number(
            iter,
            FenParseError::EmptyHalfmove,
            FenParseError::InvalidHalfmove,
        )?;
        eat(iter, ' ')?;
        pos.fullmove_clock = eat_number(
            iter,
            FenParseError::EmptyFullmove,
            FenParseError::InvalidFullmove,
        )?;

        for &color in &[Color::White, Color::Black] {
            if pos.kings(color).count() != 1 {
                return Err(FenParseError::MissingKing(color));
            }
        }

        pos.zobrist_hash = zobrist::hash(&pos);
        Ok(pos)
    }

    /// Resolves a UCI move string (`e2e4`, `e7e8q`) against the legal moves of this
    /// position.
    pub fn parse_uci_move(&self, text: &str) -> Result<Move, MoveParseError> {
        let malformed = || MoveParseError::Malformed(text.to_owned());
        if !text.is_ascii() || text.len() < 4 || text.len() > 5 {
            return Err(malformed());
        }

        let source = Square::try_from(&text[0..2]).map_err(|_| malformed())?;
        let dest = Square::try_from(&text[2..4]).map_err(|_| malformed())?;
        let promotion = match text[4..].chars().next() {
            Some(c) => match PieceKind::try_from(c) {
                Ok(kind) if kind != PieceKind::Pawn && kind != PieceKind::King => Some(kind),
                _ => return Err(malformed()),
            },
            None => None,
        };

        self.legal_moves()
            .iter()
            .find(|m| {
                m.source() == source && m.destination() == dest && m.promotion_piece() == promotion
            })
            .cloned()
            .ok_or_else(|| MoveParseError::NotLegal(text.to_owned()))
    }

    pub fn as_fen(&self) -> String {
        let mut buf = String::new();
        for &rank in RANKS.iter().rev() {
            let mut empty_squares = 0;
            for &file in &FILES {
                match self.piece_at(Square::of(rank, file)) {
                    Some(piece) => {
                        if empty_squares != 0 {
                            buf.push((b'0' + empty_squares) as char);
                        }
                        buf.push_str(&piece.to_string());
                        empty_squares = 0;
                    }
                    None => empty_squares += 1,
                }
            }

            if empty_squares != 0 {
                buf.push((b'0' + empty_squares) as char);
            }

            if rank != Rank::One {
                buf.push('/');
            }
        }

        buf.push(' ');
        buf.push_str(&self.side_to_move.to_string());
        buf.push(' ');
        if self.castle_status.is_empty() {
            buf.push('-');
        }
        if self.can_castle_kingside(Color::White) {
            buf.push('K');
        }
        if self.can_castle_queenside(Color::White) {
            buf.push('Q');
        }
        if self.can_castle_kingside(Color::Black) {
            buf.push('k');
        }
        if self.can_castle_queenside(Color::Black) {
            buf.push('q');
        }
        buf.push(' ');
        match self.en_passant_square() {
            Some(square) => buf.push_str(&square.to_string()),
            None => buf.push('-'),
        }
        buf.push_str(&format!(
            " {} {}",
            self.halfmove_clock, self.fullmove_clock
        ));
        buf
    }
}

//
// Trait implementations
//

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &rank in RANKS.iter().rev() {
            for &file in &FILES {
                match self.piece_at(Square::of(rank, file)) {
                    Some(piece) => write!(f, " {} ", piece)?,
                    None => write!(f, " . ")?,
                }
            }

            writeln!(f, "| {}", rank)?;
        }

        for _ in &FILES {
            f.write_str("---")?;
        }

        writeln!(f)?;
        for &file in &FILES {
            write!(f, " {} ", file)?;
        }

        writeln!(f)
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::from_start_position()
    }
}
