//! The class catalog (C1): built-in and user class metadata, the `Ty`
//! lattice, and the LCA join that `typeinfer` and `checks` both call into.

use indexmap::IndexMap;

/// Name of the super-of-`Obj` root. Every built-in or user class's lineage
/// terminates here.
pub const ROOT: &str = "$";

/// A type in the Quack type lattice: a concrete class, or one of the two
/// sentinels. Modeled as an enum (not a string sentinel) so a stray
/// comparison against the wrong sentinel is a type error the compiler
/// catches at the call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    /// Unknown / uninitialized — identity element of LCA.
    Bottom,
    /// Type error — absorbing element of LCA.
    Top,
    Class(String),
}

impl Ty {
    pub fn class(name: impl Into<String>) -> Self {
        Ty::Class(name.into())
    }

    pub fn as_class(&self) -> Option<&str> {
        match self {
            Ty::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Bottom => write!(f, "$B"),
            Ty::Top => write!(f, "$T"),
            Ty::Class(name) => write!(f, "{name}"),
        }
    }
}

/// Catalog entry for one class: superclass link, field types, and the three
/// parallel method tables (spec.md §3's "Class record").
#[derive(Clone, Debug)]
pub struct ClassRecord {
    /// `ROOT` for `Obj` itself, otherwise a class name.
    pub superclass: String,
    pub fields: IndexMap<String, Ty>,
    pub method_returns: IndexMap<String, Ty>,
    pub method_args: IndexMap<String, Vec<Ty>>,
    pub method_arg_names: IndexMap<String, Vec<String>>,
    /// Per-method local name → type, including formals.
    pub method_locals: IndexMap<String, IndexMap<String, Ty>>,
}

impl ClassRecord {
    fn leaf(superclass: &str) -> Self {
        Self {
            superclass: superclass.to_string(),
            fields: IndexMap::new(),
            method_returns: IndexMap::new(),
            method_args: IndexMap::new(),
            method_arg_names: IndexMap::new(),
            method_locals: IndexMap::new(),
        }
    }
}

/// The class catalog, preloaded with the five built-in classes and grown by
/// `typeinfer` as user classes are encountered.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub classes: IndexMap<String, ClassRecord>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Catalog {
    /// Builds the catalog preloaded with `Obj`, `Int`, `Boolean`, `String`,
    /// `Nothing`, grounded exactly on `default_class_map.py`.
    pub fn with_builtins() -> Self {
        let mut classes = IndexMap::new();

        let mut obj = ClassRecord::leaf(ROOT);
        add_method(&mut obj, "$constructor", Ty::class("Obj"), &[], &[]);
        add_method(&mut obj, "string", Ty::class("String"), &[], &[]);
        add_method(&mut obj, "print", Ty::class("Nothing"), &[], &[]);
        add_method(&mut obj, "equals", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        classes.insert("Obj".to_string(), obj);

        let mut int = ClassRecord::leaf("Obj");
        // `Int.$constructor`'s arg list is `["TODO"]` in the source; real
        // constructors aren't callable from user code, so it's unused —
        // fixed to `[]` here (spec.md §9 Open Questions).
        add_method(&mut int, "$constructor", Ty::class("Int"), &[], &[]);
        add_method(&mut int, "string", Ty::class("String"), &[], &[]);
        add_method(&mut int, "print", Ty::class("Nothing"), &[], &[]);
        add_method(&mut int, "plus", Ty::class("Int"), &["other"], &[Ty::class("Int")]);
        add_method(&mut int, "minus", Ty::class("Int"), &["other"], &[Ty::class("Int")]);
        add_method(&mut int, "times", Ty::class("Int"), &["other"], &[Ty::class("Int")]);
        add_method(&mut int, "divide", Ty::class("Int"), &["other"], &[Ty::class("Int")]);
        add_method(&mut int, "negate", Ty::class("Int"), &[], &[]);
        add_method(&mut int, "equals", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut int, "less", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut int, "more", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut int, "atmost", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut int, "atleast", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        classes.insert("Int".to_string(), int);

        let mut boolean = ClassRecord::leaf("Obj");
        add_method(&mut boolean, "$constructor", Ty::class("Boolean"), &[], &[]);
        add_method(&mut boolean, "string", Ty::class("String"), &[], &[]);
        add_method(&mut boolean, "print", Ty::class("Nothing"), &[], &[]);
        add_method(&mut boolean, "equals", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut boolean, "negate", Ty::class("Boolean"), &[], &[]);
        classes.insert("Boolean".to_string(), boolean);

        let mut string = ClassRecord::leaf("Obj");
        add_method(&mut string, "$constructor", Ty::class("String"), &[], &[]);
        add_method(&mut string, "string", Ty::class("String"), &[], &[]);
        add_method(&mut string, "print", Ty::class("Nothing"), &[], &[]);
        add_method(&mut string, "equals", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut string, "less", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut string, "more", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut string, "atleast", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut string, "atmost", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        add_method(&mut string, "plus", Ty::class("String"), &["other"], &[Ty::class("String")]);
        classes.insert("String".to_string(), string);

        let mut nothing = ClassRecord::leaf("Obj");
        add_method(&mut nothing, "$constructor", Ty::class("Nothing"), &[], &[]);
        add_method(&mut nothing, "string", Ty::class("String"), &[], &[]);
        add_method(&mut nothing, "print", Ty::class("Nothing"), &[], &[]);
        add_method(&mut nothing, "equals", Ty::class("Boolean"), &["other"], &[Ty::class("Obj")]);
        classes.insert("Nothing".to_string(), nothing);

        Self { classes }
    }

    pub fn get(&self, name: &str) -> Option<&ClassRecord> {
        self.classes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassRecord> {
        self.classes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    fn lineage(&self, class: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = class.to_string();
        while current != ROOT {
            chain.insert(0, current.clone());
            current = match self.classes.get(&current) {
                Some(record) => record.superclass.clone(),
                None => break,
            };
        }
        chain
    }

    /// Least common ancestor / lattice join, grounded line-for-line on
    /// `type_inf.py`'s `lca`: sentinels short-circuit, then walk both
    /// lineages from the root down and return the last class where they
    /// still agree.
    pub fn lca(&self, a: &Ty, b: &Ty) -> Ty {
        let (a, b) = match (a, b) {
            (Ty::Top, _) | (_, Ty::Top) => return Ty::Top,
            (Ty::Bottom, other) | (other, Ty::Bottom) => return other.clone(),
            (Ty::Class(a), Ty::Class(b)) => (a, b),
        };

        let lineage_a = self.lineage(a);
        let lineage_b = self.lineage(b);

        match (lineage_a.first(), lineage_b.first()) {
            (Some(root_a), Some(root_b)) if root_a == root_b => {}
            _ => return Ty::Top,
        }

        let mut i = 0;
        while i < lineage_a.len() && i < lineage_b.len() && lineage_a[i] == lineage_b[i] {
            i += 1;
        }
        Ty::Class(lineage_a[i - 1].clone())
    }
}

fn add_method(
    record: &mut ClassRecord,
    name: &str,
    returns: Ty,
    arg_names: &[&str],
    arg_types: &[Ty],
) {
    record.method_returns.insert(name.to_string(), returns);
    record
        .method_args
        .insert(name.to_string(), arg_types.to_vec());
    record.method_arg_names.insert(
        name.to_string(),
        arg_names.iter().map(|s| s.to_string()).collect(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_present() {
        let catalog = Catalog::with_builtins();
        for name in ["Obj", "Int", "Boolean", "String", "Nothing"] {
            assert!(catalog.contains(name), "missing builtin {name}");
        }
    }

    #[test]
    fn test_int_constructor_args_is_empty() {
        let catalog = Catalog::with_builtins();
        let int = catalog.get("Int").unwrap();
        assert!(int.method_args["$constructor"].is_empty());
    }

    #[test]
    fn test_lca_identical() {
        let catalog = Catalog::with_builtins();
        assert_eq!(catalog.lca(&Ty::class("Int"), &Ty::class("Int")), Ty::class("Int"));
    }

    #[test]
    fn test_lca_subclass_and_superclass() {
        let catalog = Catalog::with_builtins();
        assert_eq!(catalog.lca(&Ty::class("Int"), &Ty::class("Obj")), Ty::class("Obj"));
    }

    #[test]
    fn test_lca_bottom_is_identity() {
        let catalog = Catalog::with_builtins();
        assert_eq!(catalog.lca(&Ty::class("Int"), &Ty::Bottom), Ty::class("Int"));
        assert_eq!(catalog.lca(&Ty::Bottom, &Ty::class("Int")), Ty::class("Int"));
    }

    #[test]
    fn test_lca_top_absorbs() {
        let catalog = Catalog::with_builtins();
        assert_eq!(catalog.lca(&Ty::class("Int"), &Ty::Top), Ty::Top);
    }

    #[test]
    fn test_lca_unrelated_siblings_join_at_obj() {
        let catalog = Catalog::with_builtins();
        assert_eq!(catalog.lca(&Ty::class("Int"), &Ty::class("String")), Ty::class("Obj"));
    }

    #[test]
    fn test_lca_user_subclass_chain() {
        let mut catalog = Catalog::with_builtins();
        catalog.classes.insert("Animal".to_string(), ClassRecord::leaf("Obj"));
        catalog.classes.insert("Dog".to_string(), ClassRecord::leaf("Animal"));
        catalog.classes.insert("Cat".to_string(), ClassRecord::leaf("Animal"));
        assert_eq!(catalog.lca(&Ty::class("Dog"), &Ty::class("Cat")), Ty::class("Animal"));
        assert_eq!(catalog.lca(&Ty::class("Dog"), &Ty::class("Animal")), Ty::class("Animal"));
    }

    #[test]
    fn test_lca_is_commutative() {
        let mut catalog = Catalog::with_builtins();
        catalog.classes.insert("Animal".to_string(), ClassRecord::leaf("Obj"));
        catalog.classes.insert("Dog".to_string(), ClassRecord::leaf("Animal"));
        let a = catalog.lca(&Ty::class("Dog"), &Ty::class("Int"));
        let b = catalog.lca(&Ty::class("Int"), &Ty::class("Dog"));
        assert_eq!(a, b);
    }
}
