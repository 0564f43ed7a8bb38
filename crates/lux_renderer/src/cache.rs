//! Text serialization of a built tree, so large scenes skip the build.
//!
//! Layout, whitespace separated:
//!
//! ```text
//! <node count>
//! <root index>
//! <left> <right> <triangle> <pmin.x> <pmin.y> <pmin.z> <pmax.x> <pmax.y> <pmax.z>
//! ...one line per node, leaves write -1 -1 for their children...
//! <order[0]> <order[1]> ... <order[T-1]>
//! ```
//!
//! The last line is the permutation the build applied to the triangles, so
//! a cached tree can be matched against a freshly loaded (unordered) array.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use lux_math::{BoundingBox, Triangle, Vec3};
use thiserror::Error;

use crate::bvh::{BinaryTree, Node};

/// Errors raised while reading or writing a tree cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Inconsistent tree: {0}")]
    Invalid(String),
}

type CacheResult<T> = Result<T, CacheError>;

/// Line-oriented token reader that remembers where it is for error messages.
struct Lines<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// Move to the next non-blank line.
    fn advance(&mut self) -> CacheResult<()> {
        loop {
            self.buf.clear();
            self.line += 1;
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Err(self.error("unexpected end of file"));
            }
            if !self.buf.trim().is_empty() {
                return Ok(());
            }
        }
    }

    fn tokens(&self) -> Vec<&str> {
        self.buf.split_whitespace().collect()
    }

    fn error(&self, message: impl Into<String>) -> CacheError {
        CacheError::Parse {
            line: self.line,
            message: message.into(),
        }
    }
}

fn parse<T: std::str::FromStr>(token: &str, line: usize) -> CacheResult<T> {
    token.parse().map_err(|_| CacheError::Parse {
        line,
        message: format!("invalid number '{}'", token),
    })
}

/// Read the single value expected on the next line.
fn read_scalar<R: BufRead, T: std::str::FromStr>(lines: &mut Lines<R>) -> CacheResult<T> {
    lines.advance()?;
    let tokens = lines.tokens();
    if tokens.len() != 1 {
        return Err(lines.error(format!("expected 1 value, found {}", tokens.len())));
    }
    parse(tokens[0], lines.line)
}

impl BinaryTree {
    /// Write the tree in the cache text format.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> CacheResult<()> {
        writeln!(writer, "{}", self.nodes.len())?;
        writeln!(writer, "{}", self.root)?;

        for node in &self.nodes {
            let (left, right) = match node.children {
                Some([left, right]) => (left as i64, right as i64),
                None => (-1, -1),
            };
            let (pmin, pmax) = (node.bbox.pmin, node.bbox.pmax);
            writeln!(
                writer,
                "{} {} {} {} {} {} {} {} {}",
                left, right, node.triangle, pmin.x, pmin.y, pmin.z, pmax.x, pmax.y, pmax.z
            )?;
        }

        let order: Vec<String> = self.order.iter().map(|i| i.to_string()).collect();
        writeln!(writer, "{}", order.join(" "))?;
        Ok(())
    }

    /// Read a tree written by [`BinaryTree::write_to`] for `triangle_count` triangles.
    ///
    /// Everything is checked before the tree is returned: the node count must
    /// be `2T - 1`, every child index must be in range, the nodes reachable
    /// from the root must form a tree whose leaves cover each triangle
    /// exactly once, and the trailing order line must be a permutation.
    pub fn read_from<R: BufRead>(reader: R, triangle_count: usize) -> CacheResult<Self> {
        if triangle_count == 0 {
            return Err(CacheError::Invalid("no triangles".to_string()));
        }

        let mut lines = Lines::new(reader);
        let count: usize = read_scalar(&mut lines)?;
        if count != 2 * triangle_count - 1 {
            return Err(CacheError::Invalid(format!(
                "{} nodes for {} triangles, expected {}",
                count,
                triangle_count,
                2 * triangle_count - 1
            )));
        }

        let root: usize = read_scalar(&mut lines)?;
        if root >= count {
            return Err(CacheError::Invalid(format!("root {} out of range", root)));
        }

        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            lines.advance()?;
            let tokens = lines.tokens();
            if tokens.len() != 9 {
                return Err(lines.error(format!("expected 9 values, found {}", tokens.len())));
            }
            let line = lines.line;

            let left: i64 = parse(tokens[0], line)?;
            let right: i64 = parse(tokens[1], line)?;
            let triangle: usize = parse(tokens[2], line)?;
            let mut coords = [0.0f32; 6];
            for (value, token) in coords.iter_mut().zip(&tokens[3..]) {
                *value = parse(token, line)?;
            }

            let children = match (left, right) {
                (-1, -1) => {
                    if triangle >= triangle_count {
                        return Err(lines.error(format!("triangle {} out of range", triangle)));
                    }
                    None
                }
                (l, r) if (0..count as i64).contains(&l) && (0..count as i64).contains(&r) => {
                    Some([l as usize, r as usize])
                }
                _ => {
                    return Err(lines.error(format!("child indices {} {} out of range", left, right)))
                }
            };

            nodes.push(Node {
                bbox: BoundingBox::new(
                    Vec3::new(coords[0], coords[1], coords[2]),
                    Vec3::new(coords[3], coords[4], coords[5]),
                ),
                children,
                triangle,
            });
        }

        lines.advance()?;
        let tokens = lines.tokens();
        if tokens.len() != triangle_count {
            return Err(lines.error(format!(
                "expected {} order entries, found {}",
                triangle_count,
                tokens.len()
            )));
        }
        let line = lines.line;
        let order = tokens
            .iter()
            .map(|token| parse::<u32>(token, line))
            .collect::<CacheResult<Vec<u32>>>()?;

        let mut seen = vec![false; triangle_count];
        for &i in &order {
            match seen.get_mut(i as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(CacheError::Invalid("order is not a permutation".to_string())),
            }
        }

        validate_structure(&nodes, root, triangle_count)?;

        Ok(Self { nodes, root, order })
    }

    /// Write the tree to `path`, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CacheResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a cached tree from `path` for `triangle_count` triangles.
    pub fn load<P: AsRef<Path>>(path: P, triangle_count: usize) -> CacheResult<Self> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file), triangle_count)
    }

    /// Restore the tree cached at `path`, or build and cache a new one.
    ///
    /// `triangles` must be in load order. On return they are in the order
    /// the tree expects, whichever way it was obtained. Cache problems are
    /// logged and never fatal.
    pub fn load_or_build<P: AsRef<Path>>(path: P, triangles: &mut [Triangle]) -> Self {
        let path = path.as_ref();

        if path.exists() {
            match Self::load(path, triangles.len()) {
                Ok(tree) => {
                    tree.apply_order(triangles);
                    log::info!(
                        "Loaded tree from {} ({} nodes)",
                        path.display(),
                        tree.node_count()
                    );
                    return tree;
                }
                Err(e) => log::warn!("Ignoring tree cache {}: {}", path.display(), e),
            }
        } else {
            log::info!("No tree cache at {}, building", path.display());
        }

        let tree = Self::build(triangles);
        match tree.save(path) {
            Ok(()) => log::info!("Saved tree to {}", path.display()),
            Err(e) => log::warn!("Could not save tree to {}: {}", path.display(), e),
        }
        tree
    }
}

/// Walk the tree from `root`, checking each node is reached once and the
/// leaves cover every triangle once.
fn validate_structure(nodes: &[Node], root: usize, triangle_count: usize) -> CacheResult<()> {
    let mut visited = vec![false; nodes.len()];
    let mut covered = vec![false; triangle_count];
    let mut stack = vec![root];

    while let Some(index) = stack.pop() {
        if std::mem::replace(&mut visited[index], true) {
            return Err(CacheError::Invalid(format!("node {} reached twice", index)));
        }
        let node = &nodes[index];
        match node.children {
            Some([left, right]) => {
                stack.push(right);
                stack.push(left);
            }
            None => {
                if std::mem::replace(&mut covered[node.triangle], true) {
                    return Err(CacheError::Invalid(format!(
                        "triangle {} referenced by two leaves",
                        node.triangle
                    )));
                }
            }
        }
    }

    if let Some(missing) = covered.iter().position(|&c| !c) {
        return Err(CacheError::Invalid(format!("triangle {} not in any leaf", missing)));
    }
    Ok(())
}

/// Cache file name for a scene, derived from its geometry.
///
/// FNV-1a over the vertex positions (load order) and the triangle count.
pub fn cache_path<P: AsRef<Path>>(dir: P, triangles: &[Triangle]) -> PathBuf {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET;
    let mut feed = |bytes: &[u8]| {
        for &byte in bytes {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(PRIME);
        }
    };

    for triangle in triangles {
        for p in [triangle.a, triangle.b, triangle.c] {
            for c in p.to_array() {
                feed(&c.to_bits().to_le_bytes());
            }
        }
    }
    feed(&(triangles.len() as u64).to_le_bytes());

    dir.as_ref().join(format!("tree-{:016x}.txt", hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::tests::{four_triangles, random_triangles};

    fn serialized(tree: &BinaryTree) -> String {
        let mut out = Vec::new();
        tree.write_to(&mut out).expect("write to memory");
        String::from_utf8(out).expect("utf8")
    }

    fn built(count: usize) -> (BinaryTree, String) {
        let mut triangles = random_triangles(count, 11);
        let tree = BinaryTree::build(&mut triangles);
        let text = serialized(&tree);
        (tree, text)
    }

    #[test]
    fn test_format_layout() {
        let mut triangles = four_triangles();
        let tree = BinaryTree::build(&mut triangles);
        let text = serialized(&tree);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2 + 7 + 1);
        assert_eq!(lines[0], "7");
        assert_eq!(lines[1], "0");
        assert!(lines[2].starts_with("1 "));
        assert_eq!(lines[9].split_whitespace().count(), 4);

        let leaves = lines[2..9].iter().filter(|l| l.starts_with("-1 -1 ")).count();
        assert_eq!(leaves, 4);
    }

    #[test]
    fn test_round_trip() {
        let (tree, text) = built(200);
        let read = BinaryTree::read_from(text.as_bytes(), 200).expect("valid cache");
        assert_eq!(read, tree);
    }

    #[test]
    fn test_round_trip_single() {
        let mut triangles = vec![Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, 0)];
        let tree = BinaryTree::build(&mut triangles);
        let read = BinaryTree::read_from(serialized(&tree).as_bytes(), 1).expect("valid cache");
        assert_eq!(read, tree);
    }

    #[test]
    fn test_reject_truncated() {
        let (_, text) = built(20);
        let lines: Vec<&str> = text.lines().collect();

        // Without the order line, and cut in the middle of the nodes
        let without_order = lines[..lines.len() - 1].join("\n");
        assert!(BinaryTree::read_from(without_order.as_bytes(), 20).is_err());
        let half = lines[..lines.len() / 2].join("\n");
        assert!(BinaryTree::read_from(half.as_bytes(), 20).is_err());
        assert!(BinaryTree::read_from("".as_bytes(), 20).is_err());

        // A node line missing its last coordinate
        let mut short = lines.clone();
        let cut = lines[5].rsplit_once(' ').map(|(head, _)| head).unwrap_or("");
        short[5] = cut;
        assert!(BinaryTree::read_from(short.join("\n").as_bytes(), 20).is_err());
    }

    #[test]
    fn test_reject_wrong_triangle_count() {
        let (_, text) = built(20);
        assert!(matches!(
            BinaryTree::read_from(text.as_bytes(), 21),
            Err(CacheError::Invalid(_))
        ));
        assert!(BinaryTree::read_from(text.as_bytes(), 0).is_err());
    }

    #[test]
    fn test_reject_malformed_numbers() {
        let (_, text) = built(20);
        let broken = text.replacen("\n0\n", "\nzero\n", 1);
        assert!(matches!(
            BinaryTree::read_from(broken.as_bytes(), 20),
            Err(CacheError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_reject_inconsistent_nodes() {
        let (tree, _) = built(8);

        // Child index past the end
        let mut bad = tree.clone();
        bad.nodes[0].children = Some([1, 99]);
        assert!(BinaryTree::read_from(serialized(&bad).as_bytes(), 8).is_err());

        // Leaf pointing past the triangle array
        let mut bad = tree.clone();
        let leaf = bad.nodes.iter().position(|n| n.is_leaf()).unwrap_or(0);
        bad.nodes[leaf].triangle = 8;
        assert!(BinaryTree::read_from(serialized(&bad).as_bytes(), 8).is_err());

        // Two leaves on the same triangle
        let mut bad = tree.clone();
        let leaves: Vec<usize> = (0..bad.nodes.len()).filter(|&i| bad.nodes[i].is_leaf()).collect();
        bad.nodes[leaves[1]].triangle = bad.nodes[leaves[0]].triangle;
        assert!(matches!(
            BinaryTree::read_from(serialized(&bad).as_bytes(), 8),
            Err(CacheError::Invalid(_))
        ));

        // A cycle back to the root
        let mut bad = tree.clone();
        bad.nodes[0].children = Some([0, 1]);
        assert!(matches!(
            BinaryTree::read_from(serialized(&bad).as_bytes(), 8),
            Err(CacheError::Invalid(_))
        ));

        // Order that is not a permutation
        let mut bad = tree;
        bad.order[0] = bad.order[1];
        assert!(matches!(
            BinaryTree::read_from(serialized(&bad).as_bytes(), 8),
            Err(CacheError::Invalid(_))
        ));
    }

    #[test]
    fn test_cache_path_depends_on_geometry() {
        let a = random_triangles(10, 1);
        let b = random_triangles(10, 2);

        assert_eq!(cache_path("cache", &a), cache_path("cache", &a));
        assert_ne!(cache_path("cache", &a), cache_path("cache", &b));
        assert_ne!(cache_path("cache", &a), cache_path("cache", &a[..9]));

        let name = cache_path("cache", &a);
        assert!(name.starts_with("cache"));
        let file = name.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
        assert!(file.starts_with("tree-") && file.ends_with(".txt"));
        assert_eq!(file.len(), "tree-".len() + 16 + ".txt".len());
    }

    #[test]
    fn test_load_or_build() {
        let dir = tempfile::tempdir().expect("temp dir");
        let original = random_triangles(150, 7);
        let path = cache_path(dir.path().join("trees"), &original);

        // First run builds and writes the cache
        let mut first = original.clone();
        let built = BinaryTree::load_or_build(&path, &mut first);
        assert!(path.exists());

        // Second run restores it and reorders a fresh load the same way
        let mut second = original.clone();
        let loaded = BinaryTree::load_or_build(&path, &mut second);
        assert_eq!(loaded, built);
        assert_eq!(second, first);
    }

    #[test]
    fn test_load_or_build_rebuilds_corrupt_cache() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tree.txt");
        std::fs::write(&path, "3\n0\ngarbage\n").expect("write corrupt cache");

        let mut triangles = random_triangles(30, 8);
        let tree = BinaryTree::load_or_build(&path, &mut triangles);
        assert_eq!(tree.node_count(), 59);

        // The corrupt file was replaced by a valid one
        let reloaded = BinaryTree::load(&path, 30).expect("rewritten cache");
        assert_eq!(reloaded, tree);
    }
}
