use crate::core::models::atom_types::AtomTypeSet;
use crate::core::models::graph::{CoordinationRange, Graph, GraphError, Node};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Version tag written as the first integer of every serialized graph.
pub const FORMAT_VERSION: i64 = 1;

/// Hydrogen-count value meaning "unspecified".
const UNSPECIFIED_HYDROGENS: i64 = -1;

/// Negative codes reserved for critical-point pseudo-elements.
const RESERVED_CODES: std::ops::RangeInclusive<i64> = -9..=-6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphFormatError {
    #[error("Invalid integer '{token}' at position {position}")]
    InvalidToken { position: usize, token: String },
    #[error("Unexpected end of input while reading {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("Unsupported graph format version {0}")]
    UnsupportedVersion(i64),
    #[error("Invalid {field} value {value} at position {position}")]
    InvalidValue {
        field: &'static str,
        value: i64,
        position: usize,
    },
    #[error("Node {node} uses undefined wildcard code {code}")]
    UndefinedWildcard { node: usize, code: i64 },
    #[error("Wildcard code {0} is defined more than once")]
    DuplicateWildcard(i64),
    #[error("Wildcard code {0} lists no atomic numbers")]
    EmptyWildcard(i64),
    #[error("Node {node} has atomic number {number}, which the format cannot represent")]
    UnrepresentableType { node: usize, number: i32 },
    #[error("Unexpected trailing input at position {0}")]
    TrailingInput(usize),
    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),
}

#[derive(Debug, Error)]
pub enum GraphFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Line {line}: {source}")]
    Format {
        line: usize,
        #[source]
        source: GraphFormatError,
    },
}

/// Serializes a graph into the integer interchange format
/// `1 N E (z H cmin cmax)×N (u v)×E [code z… 0]… 0` with 1-based indices.
///
/// Wildcard type sets are assigned negative codes -1, -2, … (skipping the
/// pseudo-element codes -6..=-9) in order of first appearance; nodes with the
/// same set share one code.
///
/// Fails with [`GraphFormatError::UnrepresentableType`] for a concrete atomic
/// number that is neither positive nor a pseudo-element code, or a wildcard
/// member of zero, since those would read back as something else.
pub fn serialize_graph(graph: &Graph) -> Result<String, GraphFormatError> {
    let mut codes: Vec<(&AtomTypeSet, i64)> = Vec::new();
    let mut next_code = -1;
    let mut tokens: Vec<i64> = Vec::with_capacity(4 + 4 * graph.len() + 2 * graph.edge_count());

    tokens.extend([FORMAT_VERSION, graph.len() as i64, graph.edge_count() as i64]);
    for (index, node) in graph.nodes().iter().enumerate() {
        let unrepresentable = |number| GraphFormatError::UnrepresentableType {
            node: index + 1,
            number,
        };
        if let Some(&zero) = node.types.numbers().iter().find(|&&z| z == 0) {
            return Err(unrepresentable(zero));
        }
        let z = match node.types.single_number() {
            Some(z) if z > 0 || RESERVED_CODES.contains(&i64::from(z)) => i64::from(z),
            Some(z) => return Err(unrepresentable(z)),
            None => match codes.iter().find(|(set, _)| **set == node.types) {
                Some(&(_, code)) => code,
                None => {
                    while RESERVED_CODES.contains(&next_code) {
                        next_code -= 1;
                    }
                    let code = next_code;
                    codes.push((&node.types, code));
                    next_code -= 1;
                    code
                }
            },
        };
        let hydrogens = node.hydrogens.map_or(UNSPECIFIED_HYDROGENS, i64::from);
        tokens.extend([
            z,
            hydrogens,
            node.coordination.min as i64,
            node.coordination.max as i64,
        ]);
    }
    for &(u, v) in graph.edges() {
        tokens.extend([u as i64 + 1, v as i64 + 1]);
    }
    for (set, code) in &codes {
        tokens.push(*code);
        tokens.extend(set.numbers().iter().map(|&z| i64::from(z)));
        tokens.push(0);
    }
    tokens.push(0);

    Ok(tokens
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(" "))
}

struct TokenReader<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> TokenReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            tokens: text.split_whitespace().collect(),
            pos: 0,
        }
    }

    fn next(&mut self, expected: &'static str) -> Result<(usize, i64), GraphFormatError> {
        let position = self.pos;
        let token = self
            .tokens
            .get(position)
            .ok_or(GraphFormatError::UnexpectedEnd { expected })?;
        self.pos += 1;
        token
            .parse::<i64>()
            .map(|value| (position, value))
            .map_err(|_| GraphFormatError::InvalidToken {
                position,
                token: token.to_string(),
            })
    }

    fn count(&mut self, field: &'static str) -> Result<usize, GraphFormatError> {
        let (position, value) = self.next(field)?;
        usize::try_from(value).map_err(|_| GraphFormatError::InvalidValue {
            field,
            value,
            position,
        })
    }

    fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.pos)
    }

    fn is_exhausted(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

struct RawNode {
    position: usize,
    code: i64,
    hydrogens: Option<u32>,
    coordination: CoordinationRange,
}

/// Parses a graph from the interchange format produced by [`serialize_graph`].
pub fn parse_template(text: &str) -> Result<Graph, GraphFormatError> {
    let mut reader = TokenReader::new(text);

    let (_, version) = reader.next("format version")?;
    if version != FORMAT_VERSION {
        return Err(GraphFormatError::UnsupportedVersion(version));
    }
    let node_count = reader.count("node count")?;
    let edge_count = reader.count("edge count")?;

    // Counts come from the input; reserve no more than the tokens can fill.
    let mut raw_nodes = Vec::with_capacity(node_count.min(reader.remaining() / 4));
    for _ in 0..node_count {
        let (type_position, code) = reader.next("node type")?;
        if code == 0 {
            return Err(GraphFormatError::InvalidValue {
                field: "node type",
                value: code,
                position: type_position,
            });
        }
        let (position, h) = reader.next("hydrogen count")?;
        let hydrogens = match h {
            UNSPECIFIED_HYDROGENS => None,
            h => Some(u32::try_from(h).map_err(|_| GraphFormatError::InvalidValue {
                field: "hydrogen count",
                value: h,
                position,
            })?),
        };
        let mut bounds = [0u32; 2];
        let fields = ["minimum coordination", "maximum coordination"];
        for (slot, field) in fields.into_iter().enumerate() {
            let (position, value) = reader.next(field)?;
            bounds[slot] = u32::try_from(value).map_err(|_| GraphFormatError::InvalidValue {
                field,
                value,
                position,
            })?;
        }
        raw_nodes.push(RawNode {
            position: type_position,
            code,
            hydrogens,
            coordination: CoordinationRange::new(bounds[0], bounds[1]),
        });
    }

    let mut edges = Vec::with_capacity(edge_count.min(reader.remaining() / 2));
    for _ in 0..edge_count {
        let mut endpoints = [0usize; 2];
        for endpoint in &mut endpoints {
            let (position, value) = reader.next("edge endpoint")?;
            if value < 1 || value as usize > node_count {
                return Err(GraphFormatError::InvalidValue {
                    field: "edge endpoint",
                    value,
                    position,
                });
            }
            *endpoint = value as usize - 1;
        }
        edges.push((endpoints[0], endpoints[1]));
    }

    let wildcards = parse_wildcards(&mut reader)?;
    if !reader.is_exhausted() {
        return Err(GraphFormatError::TrailingInput(reader.pos));
    }

    let mut graph = Graph::new();
    for (index, raw) in raw_nodes.into_iter().enumerate() {
        let is_element = raw.code > 0
            || (RESERVED_CODES.contains(&raw.code) && !wildcards.contains_key(&raw.code));
        let types = if is_element {
            let number = i32::try_from(raw.code).map_err(|_| GraphFormatError::InvalidValue {
                field: "node type",
                value: raw.code,
                position: raw.position,
            })?;
            AtomTypeSet::single(number)
        } else {
            wildcards
                .get(&raw.code)
                .cloned()
                .ok_or(GraphFormatError::UndefinedWildcard {
                    node: index + 1,
                    code: raw.code,
                })?
        };
        graph.add_node(Node {
            types,
            hydrogens: raw.hydrogens,
            coordination: raw.coordination,
        });
    }
    for (u, v) in edges {
        graph.add_edge(u, v)?;
    }
    graph.validate()?;
    Ok(graph)
}

fn parse_wildcards(
    reader: &mut TokenReader<'_>,
) -> Result<BTreeMap<i64, AtomTypeSet>, GraphFormatError> {
    let mut wildcards = BTreeMap::new();
    loop {
        let (position, code) = reader.next("wildcard trailer")?;
        if code == 0 {
            return Ok(wildcards);
        }
        if code > 0 {
            return Err(GraphFormatError::InvalidValue {
                field: "wildcard code",
                value: code,
                position,
            });
        }
        let mut members = Vec::new();
        loop {
            let (position, z) = reader.next("wildcard members")?;
            if z == 0 {
                break;
            }
            members.push(i32::try_from(z).map_err(|_| GraphFormatError::InvalidValue {
                field: "wildcard member",
                value: z,
                position,
            })?);
        }
        let set = AtomTypeSet::new(members).ok_or(GraphFormatError::EmptyWildcard(code))?;
        if wildcards.insert(code, set).is_some() {
            return Err(GraphFormatError::DuplicateWildcard(code));
        }
    }
}

/// Reads one serialized graph per non-empty line.
pub fn read_graphs(reader: &mut impl BufRead) -> Result<Vec<Graph>, GraphFileError> {
    let mut graphs = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let graph = parse_template(&line).map_err(|source| GraphFileError::Format {
            line: index + 1,
            source,
        })?;
        graphs.push(graph);
    }
    Ok(graphs)
}

/// Writes one serialized graph per line.
pub fn write_graphs<'a>(
    graphs: impl IntoIterator<Item = &'a Graph>,
    writer: &mut impl Write,
) -> Result<(), GraphFileError> {
    for (index, graph) in graphs.into_iter().enumerate() {
        let line = serialize_graph(graph).map_err(|source| GraphFileError::Format {
            line: index + 1,
            source,
        })?;
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethanol_fragment() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(Node::element(6).with_hydrogens(3).with_coordination(1, 1));
        graph.add_node(Node::element(6));
        graph.add_node(Node::new(AtomTypeSet::new([7, 8]).unwrap()).with_hydrogens(1));
        graph.add_node(Node::new(AtomTypeSet::new([9, 17]).unwrap()));
        graph.add_node(Node::new(AtomTypeSet::new([7, 8]).unwrap()));
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(2, 1).unwrap();
        graph.add_edge(1, 3).unwrap();
        graph.add_edge(4, 3).unwrap();
        graph
    }

    #[test]
    fn serializes_concrete_graph() {
        let mut graph = Graph::new();
        graph.add_node(Node::element(8).with_hydrogens(2));
        graph.add_node(Node::element(1).with_coordination(1, 1));
        graph.add_edge(1, 0).unwrap();
        assert_eq!(
            serialize_graph(&graph).unwrap(),
            "1 2 1 8 2 0 14 1 -1 1 1 1 2 0"
        );
    }

    #[test]
    fn wildcards_share_codes_and_follow_edges() {
        let text = serialize_graph(&ethanol_fragment()).unwrap();
        assert_eq!(
            text,
            "1 5 4 6 3 1 1 6 -1 0 14 -1 1 0 14 -2 -1 0 14 -1 -1 0 14 \
             1 2 2 3 2 4 4 5 -1 7 8 0 -2 9 17 0 0"
        );
    }

    #[test]
    fn round_trip_preserves_graph() {
        let graph = ethanol_fragment();
        let text = serialize_graph(&graph).unwrap();
        assert_eq!(parse_template(&text).unwrap(), graph);
        let empty = serialize_graph(&Graph::new()).unwrap();
        assert_eq!(parse_template(&empty).unwrap(), Graph::new());
    }

    #[test]
    fn wildcard_codes_skip_pseudo_element_range() {
        let mut graph = Graph::new();
        for z in 0..6 {
            graph.add_node(Node::new(AtomTypeSet::new([1, 10 + z]).unwrap()));
        }
        graph.add_node(Node::element(-7));
        let text = serialize_graph(&graph).unwrap();
        assert!(text.contains(" -10 1 15 0 "));
        assert_eq!(parse_template(&text).unwrap(), graph);
    }

    #[test]
    fn parse_tolerates_arbitrary_whitespace() {
        let graph = parse_template("1\n3 2\n 6 -1 0 14  6 -1 0 14\t7 0 1 3\n1 2 2 3 0\n").unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.edges(), &[(0, 1), (1, 2)]);
        assert_eq!(graph.node(2).hydrogens, Some(0));
        assert_eq!(graph.node(2).coordination, CoordinationRange::new(1, 3));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert_eq!(
            parse_template("2 0 0 0"),
            Err(GraphFormatError::UnsupportedVersion(2))
        );
        assert!(matches!(
            parse_template("1 1 0 6 -1 0"),
            Err(GraphFormatError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_template("1 1 0 six -1 0 14 0"),
            Err(GraphFormatError::InvalidToken { position: 3, .. })
        ));
        assert_eq!(
            parse_template("1 1 0 -3 -1 0 14 0"),
            Err(GraphFormatError::UndefinedWildcard { node: 1, code: -3 })
        );
        assert!(matches!(
            parse_template("1 2 1 6 -1 0 14 6 -1 0 14 1 3 0"),
            Err(GraphFormatError::InvalidValue { field: "edge endpoint", value: 3, .. })
        ));
        assert_eq!(
            parse_template("1 1 1 6 -1 0 14 1 1 0"),
            Err(GraphFormatError::Graph(GraphError::SelfLoop(0)))
        );
        assert!(matches!(
            parse_template("1 1 0 6 -1 5 2 0"),
            Err(GraphFormatError::Graph(GraphError::InvalidCoordination { .. }))
        ));
        assert_eq!(
            parse_template("1 1 0 6 -1 0 14 0 7"),
            Err(GraphFormatError::TrailingInput(8))
        );
        assert_eq!(
            parse_template("1 1 0 -1 -1 0 14 -1 0 0"),
            Err(GraphFormatError::EmptyWildcard(-1))
        );
    }

    #[test]
    fn oversized_counts_fail_without_allocating() {
        assert_eq!(
            parse_template("1 1000000000000000000 0 6 0 0 4 0"),
            Err(GraphFormatError::InvalidValue {
                field: "node type",
                value: 0,
                position: 7,
            })
        );
        assert_eq!(
            parse_template("1 1000000000000000000 0 6 0 0 4"),
            Err(GraphFormatError::UnexpectedEnd {
                expected: "node type"
            })
        );
        assert_eq!(
            parse_template("1 1 18446744073709551615 6 -1 0 14 0"),
            Err(GraphFormatError::InvalidToken {
                position: 2,
                token: "18446744073709551615".to_string()
            })
        );
        assert!(matches!(
            parse_template("1 2 9223372036854775807 6 -1 0 14 6 -1 0 14 1 2"),
            Err(GraphFormatError::UnexpectedEnd { expected: "edge endpoint" })
        ));
    }

    #[test]
    fn out_of_range_atomic_numbers_are_rejected() {
        assert_eq!(
            parse_template("1 1 0 4294967302 -1 0 14 0"),
            Err(GraphFormatError::InvalidValue {
                field: "node type",
                value: 4_294_967_302,
                position: 3,
            })
        );
        assert_eq!(
            parse_template("1 1 0 -1 -1 0 14 -1 7 4294967304 0 0"),
            Err(GraphFormatError::InvalidValue {
                field: "wildcard member",
                value: 4_294_967_304,
                position: 9,
            })
        );
    }

    #[test]
    fn serialization_rejects_types_that_would_read_back_differently() {
        let mut graph = Graph::new();
        graph.add_node(Node::element(6));
        graph.add_node(Node::element(-3));
        assert_eq!(
            serialize_graph(&graph),
            Err(GraphFormatError::UnrepresentableType { node: 2, number: -3 })
        );

        let mut graph = Graph::new();
        graph.add_node(Node::new(AtomTypeSet::new([0, 8]).unwrap()));
        assert_eq!(
            serialize_graph(&graph),
            Err(GraphFormatError::UnrepresentableType { node: 1, number: 0 })
        );

        let mut buffer = Vec::new();
        let err = write_graphs([&ethanol_fragment(), &graph], &mut buffer).unwrap_err();
        assert!(matches!(err, GraphFileError::Format { line: 2, .. }));
    }

    #[test]
    fn graphs_are_read_and_written_line_by_line() {
        let graphs = vec![ethanol_fragment(), Graph::new()];
        let mut buffer = Vec::new();
        write_graphs(&graphs, &mut buffer).unwrap();
        let read = read_graphs(&mut buffer.as_slice()).unwrap();
        assert_eq!(read, graphs);

        let err = read_graphs(&mut "1 0 0 0\n\nbad\n".as_bytes()).unwrap_err();
        assert!(matches!(err, GraphFileError::Format { line: 3, .. }));
    }
}
