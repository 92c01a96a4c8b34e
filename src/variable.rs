//! Categorical variables and joint variables.
//!
//! A [`Variable`] is a named sequence of categorical codes, one per sample.
//! Instances are either borrowed from the dataset that created the variable,
//! owned, produced lazily by a loader on first access, or uniform (the
//! universal variable Ω, which takes the value [`OMEGA_VALUE`] everywhere).
//!
//! A [`JointVariable`] composes several variables into one tuple-valued
//! variable. Nested joint variables are flattened, so a joint variable is
//! always a flat, ordered list of simple variables.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::key::Key;
use crate::types::{VarId, VarLabel, Value, OMEGA_VALUE};

#[derive(Clone)]
enum Instances<'a> {
    Borrowed(&'a [Value]),
    Owned(Vec<Value>),
    Uniform { value: Value, count: usize },
}

impl Instances<'_> {
    fn len(&self) -> usize {
        match self {
            Instances::Borrowed(s) => s.len(),
            Instances::Owned(v) => v.len(),
            Instances::Uniform { count, .. } => *count,
        }
    }

    fn get(&self, row: usize) -> Value {
        match self {
            Instances::Borrowed(s) => s[row],
            Instances::Owned(v) => v[row],
            Instances::Uniform { value, .. } => *value,
        }
    }
}

type Loader<'a> = Rc<dyn Fn() -> Vec<Value> + 'a>;

/// Anything that yields one key per sample.
pub trait Observed {
    /// Number of samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The key observed at `row`.
    fn key_at(&self, row: usize) -> Key;

    /// Labels of the simple variables making up the keys, in key order.
    fn labels(&self) -> Vec<VarLabel>;

    /// Ids of the dataset columns making up the keys, in key order.
    fn ids(&self) -> Vec<VarId> {
        self.labels().into_iter().filter_map(VarLabel::id).collect()
    }
}

/// A single categorical variable.
#[derive(Clone)]
pub struct Variable<'a> {
    label: VarLabel,
    name: String,
    instances: OnceCell<Instances<'a>>,
    loader: Option<Loader<'a>>,
    values: OnceCell<Vec<Value>>,
}

impl<'a> Variable<'a> {
    /// A variable borrowing its instances, typically a dataset column.
    pub fn borrowed(label: VarLabel, name: impl Into<String>, instances: &'a [Value]) -> Self {
        Self::with_instances(label, name.into(), Instances::Borrowed(instances))
    }

    /// An unnamed variable owning its instances.
    pub fn new(instances: Vec<Value>) -> Self {
        Self::with_instances(VarLabel::Unnamed, "unnamed".to_string(), Instances::Owned(instances))
    }

    /// A variable whose instances are produced by `loader` on first access.
    pub fn lazy(label: VarLabel, name: impl Into<String>, loader: impl Fn() -> Vec<Value> + 'a) -> Self {
        Self {
            label,
            name: name.into(),
            instances: OnceCell::new(),
            loader: Some(Rc::new(loader)),
            values: OnceCell::new(),
        }
    }

    /// The universal variable Ω over `count` samples.
    pub fn omega(count: usize) -> Self {
        let var = Self::with_instances(
            VarLabel::Omega,
            "Ω".to_string(),
            Instances::Uniform {
                value: OMEGA_VALUE,
                count,
            },
        );
        let _ = var.values.set(vec![OMEGA_VALUE]);
        var
    }

    fn with_instances(label: VarLabel, name: String, instances: Instances<'a>) -> Self {
        Self {
            label,
            name,
            instances: OnceCell::from(instances),
            loader: None,
            values: OnceCell::new(),
        }
    }

    pub fn label(&self) -> VarLabel {
        self.label
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assigns the variable a column id.
    pub fn with_id(mut self, id: VarId) -> Self {
        self.label = VarLabel::Column(id);
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.instances.get().is_some()
    }

    fn instances(&self) -> &Instances<'a> {
        self.instances.get_or_init(|| match &self.loader {
            Some(loader) => Instances::Owned(loader()),
            None => Instances::Owned(Vec::new()),
        })
    }

    /// The value observed at `row`.
    pub fn get(&self, row: usize) -> Value {
        self.instances().get(row)
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        let instances = self.instances();
        (0..instances.len()).map(move |row| instances.get(row))
    }

    /// Sorted distinct values observed for this variable.
    pub fn values(&self) -> &[Value] {
        self.values.get_or_init(|| {
            let mut values: Vec<Value> = self.iter().collect();
            values.sort_unstable();
            values.dedup();
            values
        })
    }
}

impl Observed for Variable<'_> {
    fn len(&self) -> usize {
        self.instances().len()
    }

    fn key_at(&self, row: usize) -> Key {
        Key::scalar(self.get(row))
    }

    fn labels(&self) -> Vec<VarLabel> {
        vec![self.label]
    }
}

impl fmt::Debug for Variable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("label", &self.label)
            .field("name", &self.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Several variables viewed as one tuple-valued variable.
#[derive(Clone, Debug)]
pub struct JointVariable<'a> {
    variables: Vec<Variable<'a>>,
}

/// A constituent of a [`JointVariable`].
pub enum Component<'a> {
    Single(Variable<'a>),
    Joint(JointVariable<'a>),
}

impl<'a> From<Variable<'a>> for Component<'a> {
    fn from(v: Variable<'a>) -> Self {
        Component::Single(v)
    }
}

impl<'a> From<JointVariable<'a>> for Component<'a> {
    fn from(v: JointVariable<'a>) -> Self {
        Component::Joint(v)
    }
}

impl<'a> JointVariable<'a> {
    /// Composes the given components, flattening nested joint variables.
    ///
    /// Fails with [`Error::UnequalInstanceCount`] if the members disagree on
    /// the number of samples.
    pub fn new<I, C>(components: I) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<Component<'a>>,
    {
        let mut variables = Vec::new();
        for component in components {
            match component.into() {
                Component::Single(v) => variables.push(v),
                Component::Joint(j) => variables.extend(j.variables),
            }
        }
        validate_instance_counts(&variables)?;
        Ok(Self { variables })
    }

    pub fn variables(&self) -> &[Variable<'a>] {
        &self.variables
    }

    pub fn name(&self) -> String {
        let names: Vec<&str> = self.variables.iter().map(|v| v.name()).collect();
        format!("{{{}}}", names.join(", "))
    }
}

impl Observed for JointVariable<'_> {
    fn len(&self) -> usize {
        self.variables.first().map_or(0, |v| v.len())
    }

    fn key_at(&self, row: usize) -> Key {
        Key::from_values(self.variables.iter().map(|v| v.get(row)).collect())
    }

    fn labels(&self) -> Vec<VarLabel> {
        self.variables.iter().map(|v| v.label()).collect()
    }
}

/// Checks that all variables report the same number of instances.
pub fn validate_instance_counts(variables: &[Variable<'_>]) -> Result<()> {
    for pair in variables.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.len() != b.len() {
            return Err(Error::UnequalInstanceCount {
                first: a.name().to_string(),
                second: b.name().to_string(),
                first_len: a.len(),
                second_len: b.len(),
            });
        }
    }
    Ok(())
}
