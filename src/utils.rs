use crate::engine::{Action, Inventory, LearnableSpell, Recipe, Spell, SpellDescriptor};
use crate::solver::TurnInput;
use std::io::{self, BufRead};
use thiserror::Error;

const ACTION_FIELDS: usize = 11;
const INVENTORY_FIELDS: usize = 5;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("input ended in the middle of a turn")]
    UnexpectedEof,
    #[error("expected {expected} lines for this turn, found {found}")]
    MissingLines { expected: usize, found: usize },
    #[error("line {line} has {found} fields (expected {expected})")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: '{value}' is not an integer")]
    InvalidInteger { line: usize, value: String },
    #[error("line {line}: unknown action type '{kind}'")]
    UnknownActionType { line: usize, kind: String },
}

/// Parses one turn of the text protocol.
///
/// The expected layout is:
/// - a line with the number of actions `n`;
/// - `n` action lines: `id type d0 d1 d2 d3 price tome_index tax_count castable repeatable`;
/// - the player's inventory line: `i0 i1 i2 i3 score`;
/// - the opponent's inventory line (validated, then ignored).
///
/// `CAST` lines become spells (exhausted when not castable), `LEARN` lines become
/// tome spells ordered by tome index with the tax count as reward, and `BREW`
/// lines become recipes rewarded with their price. `OPPONENT_CAST` lines are
/// skipped. `turns_elapsed` and `turns_remaining` are left at zero for the
/// caller to fill in.
///
/// # Examples
/// ```
/// use potion_solver::utils::parse_turn;
///
/// let lines = [
///     "2",
///     "44 BREW 0 -2 0 0 8 0 0 0 0",
///     "78 CAST 2 0 0 0 0 -1 -1 1 0",
///     "3 0 0 0 0",
///     "3 0 0 0 0",
/// ];
/// let turn = parse_turn(&lines).unwrap();
/// assert_eq!(turn.recipes.len(), 1);
/// assert_eq!(turn.spells.len(), 1);
/// assert_eq!(turn.inventory.total(), 3);
/// ```
pub fn parse_turn(lines: &[&str]) -> Result<TurnInput, ProtocolError> {
    let count_line = lines.first().ok_or(ProtocolError::MissingLines {
        expected: 1,
        found: 0,
    })?;
    let count = parse_fields(count_line, 1, 1)?[0];
    let count = usize::try_from(count).map_err(|_| ProtocolError::InvalidInteger {
        line: 1,
        value: count_line.trim().to_string(),
    })?;
    let expected = count + 3;
    if lines.len() < expected {
        return Err(ProtocolError::MissingLines {
            expected,
            found: lines.len(),
        });
    }

    let mut turn = TurnInput::default();
    let mut tome: Vec<(i32, LearnableSpell)> = Vec::new();

    for (offset, line) in lines[1..=count].iter().enumerate() {
        let line_no = offset + 2;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != ACTION_FIELDS {
            return Err(ProtocolError::FieldCount {
                line: line_no,
                expected: ACTION_FIELDS,
                found: fields.len(),
            });
        }
        // Every field but the type tag is numeric.
        let mut numbers = [0i32; ACTION_FIELDS - 1];
        let numeric = fields
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, raw)| *raw);
        for (slot, raw) in numbers.iter_mut().zip(numeric) {
            *slot = parse_int(raw, line_no)?;
        }
        let [id, d0, d1, d2, d3, price, tome_index, tax_count, castable, repeatable] = numbers;
        let id = u32::try_from(id).map_err(|_| ProtocolError::InvalidInteger {
            line: line_no,
            value: fields[0].to_string(),
        })?;
        let delta = Inventory::new([d0, d1, d2, d3]);

        match fields[1] {
            "BREW" => turn.recipes.push(Recipe::new(id, delta, price.max(0) as u32)),
            "CAST" => {
                let descriptor = SpellDescriptor::new(id, delta, repeatable != 0);
                turn.spells.push(Spell {
                    descriptor,
                    exhausted: castable == 0,
                });
            }
            "LEARN" => tome.push((
                tome_index,
                LearnableSpell {
                    descriptor: SpellDescriptor::new(id, delta, repeatable != 0),
                    reward: tax_count.max(0) as u32,
                },
            )),
            "OPPONENT_CAST" => {}
            other => {
                return Err(ProtocolError::UnknownActionType {
                    line: line_no,
                    kind: other.to_string(),
                })
            }
        }
    }

    tome.sort_by_key(|(index, _)| *index);
    turn.learnables = tome.into_iter().map(|(_, spell)| spell).collect();

    let own = parse_fields(lines[count + 1], INVENTORY_FIELDS, count + 2)?;
    parse_fields(lines[count + 2], INVENTORY_FIELDS, count + 3)?;
    turn.inventory = Inventory::new([own[0], own[1], own[2], own[3]]);

    Ok(turn)
}

/// Reads the lines of one turn from `reader` and parses them.
///
/// # Returns
/// * `Ok(None)` if the input ends before a new turn starts.
/// * `Err(ProtocolError::UnexpectedEof)` if it ends part-way through a turn.
pub fn read_turn<R: BufRead>(reader: &mut R) -> Result<Option<TurnInput>, ProtocolError> {
    let first = match read_line(reader)? {
        Some(line) => line,
        None => return Ok(None),
    };
    let count = parse_fields(&first, 1, 1)?[0].max(0) as usize;

    let mut lines = vec![first];
    for _ in 0..count + 2 {
        lines.push(read_line(reader)?.ok_or(ProtocolError::UnexpectedEof)?);
    }
    let borrowed: Vec<&str> = lines.iter().map(String::as_str).collect();
    parse_turn(&borrowed).map(Some)
}

/// Renders `action` as a protocol command, optionally followed by a free-text
/// annotation.
pub fn format_command(action: Action, annotation: Option<&str>) -> String {
    match annotation {
        Some(note) if !note.is_empty() => format!("{} {}", action, note),
        _ => action.to_string(),
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ProtocolError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end().to_string()))
}

fn parse_fields(line: &str, expected: usize, line_no: usize) -> Result<Vec<i32>, ProtocolError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != expected {
        return Err(ProtocolError::FieldCount {
            line: line_no,
            expected,
            found: fields.len(),
        });
    }
    fields.iter().map(|raw| parse_int(raw, line_no)).collect()
}

fn parse_int(raw: &str, line_no: usize) -> Result<i32, ProtocolError> {
    raw.parse::<i32>().map_err(|_| ProtocolError::InvalidInteger {
        line: line_no,
        value: raw.to_string(),
    })
}
