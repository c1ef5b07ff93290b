use std::collections::{HashMap, HashSet};

use log::{debug, info};
use model_specs::GraphSpec;
use ndarray::{concatenate, prelude::*};

use crate::{
    arch::ConvNet,
    error::{MlErr, Result},
    metrics,
    shape::Shape,
};

/// Identifies a model inside a `ModelGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(usize);

impl ModelId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The output of a forward pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// Raw model outputs, `(batch, *out_dim)`.
    Scores(ArrayD<f32>),
    /// One class index per sample.
    Classes(Array1<usize>),
}

impl Prediction {
    pub fn scores(&self) -> Option<&ArrayD<f32>> {
        match self {
            Prediction::Scores(scores) => Some(scores),
            Prediction::Classes(_) => None,
        }
    }

    pub fn classes(&self) -> Option<&Array1<usize>> {
        match self {
            Prediction::Scores(_) => None,
            Prediction::Classes(classes) => Some(classes),
        }
    }
}

#[derive(Debug)]
struct Node {
    model: ConvNet,
    // Concatenation order of the input networks' outputs.
    inputs: Vec<ModelId>,
}

/// An arena owning composed models.
///
/// Input networks are stored as ids, the graph is kept acyclic and every attachment is
/// validated against the shapes of everything reachable upstream.
#[derive(Debug, Default)]
pub struct ModelGraph {
    nodes: Vec<Node>,
    names: HashMap<String, ModelId>,
}

impl ModelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph following a spec: every model is created and then attached to the input
    /// networks it names.
    ///
    /// # Arguments
    /// * `spec` - The specification of the composition.
    pub fn from_spec(spec: &GraphSpec) -> Result<Self> {
        let mut graph = Self::new();

        for model_spec in &spec.models {
            graph.insert(ConvNet::from_spec(model_spec)?)?;
        }

        for model_spec in &spec.models {
            if model_spec.input_networks.is_empty() {
                continue;
            }

            let downstream = graph.id_of(&model_spec.name)?;
            let upstreams = model_spec
                .input_networks
                .iter()
                .map(|name| graph.id_of(name))
                .collect::<Result<Vec<_>>>()?;

            graph.add_input_networks(downstream, &upstreams)?;
        }

        Ok(graph)
    }

    /// Builds a graph from the json representation of a `GraphSpec`.
    pub fn from_json(s: &str) -> Result<Self> {
        Self::from_spec(&GraphSpec::from_json(s)?)
    }

    /// Adds a model to the graph.
    ///
    /// # Returns
    /// The id of the model or an error if its name is already taken.
    pub fn insert(&mut self, model: ConvNet) -> Result<ModelId> {
        if self.names.contains_key(model.name()) {
            return Err(MlErr::DuplicateName(model.name().to_string()));
        }

        let id = ModelId(self.nodes.len());
        self.names.insert(model.name().to_string(), id);
        self.nodes.push(Node {
            model,
            inputs: Vec::new(),
        });

        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the ids of every model in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ModelId> {
        (0..self.nodes.len()).map(ModelId)
    }

    /// Returns the id of the model named `name`.
    pub fn id(&self, name: &str) -> Option<ModelId> {
        self.names.get(name).copied()
    }

    fn id_of(&self, name: &str) -> Result<ModelId> {
        self.id(name)
            .ok_or_else(|| MlErr::InvalidConfig(format!("there's no model named {name:?}")))
    }

    fn node(&self, id: ModelId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(MlErr::UnknownModel(id.0))
    }

    pub fn get(&self, id: ModelId) -> Result<&ConvNet> {
        Ok(&self.node(id)?.model)
    }

    pub fn get_mut(&mut self, id: ModelId) -> Result<&mut ConvNet> {
        self.nodes
            .get_mut(id.0)
            .map(|node| &mut node.model)
            .ok_or(MlErr::UnknownModel(id.0))
    }

    /// Returns the input networks of a model by name, in concatenation order.
    pub fn input_networks(&self, id: ModelId) -> Result<Vec<(&str, ModelId)>> {
        let node = self.node(id)?;

        node.inputs
            .iter()
            .map(|&input| Ok((self.get(input)?.name(), input)))
            .collect()
    }

    /// Returns the input network of a model named `name`, if attached.
    pub fn input_network(&self, id: ModelId, name: &str) -> Option<ModelId> {
        let input = self.id(name)?;
        let node = self.nodes.get(id.0)?;
        node.inputs.contains(&input).then_some(input)
    }

    /// Attaches `upstream` as an input network of `downstream`.
    ///
    /// The spatial output of `upstream` has to equal the spatial input of `downstream`, and the
    /// channels of every attached input network have to add up to its input channels.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the shapes don't fit, in which case nothing is attached.
    pub fn add_input_network(&mut self, downstream: ModelId, upstream: ModelId) -> Result<()> {
        self.add_input_networks(downstream, &[upstream])
    }

    /// Attaches several input networks at once, validating their combined shape once.
    ///
    /// # Arguments
    /// * `downstream` - The model receiving the outputs.
    /// * `upstreams` - The models whose outputs are concatenated, in order, after the already
    ///   attached ones.
    pub fn add_input_networks(&mut self, downstream: ModelId, upstreams: &[ModelId]) -> Result<()> {
        let down_name = self.get(downstream)?.name().to_string();
        let mut inputs = self.node(downstream)?.inputs.clone();

        for &upstream in upstreams {
            let up_name = self.get(upstream)?.name().to_string();

            if inputs.contains(&upstream) {
                return Err(MlErr::InvalidConfig(format!(
                    "{up_name:?} is already an input network of {down_name:?}"
                )));
            }

            if self.reachable(upstream)?.contains(&downstream) {
                return Err(MlErr::Cycle {
                    downstream: down_name,
                    upstream: up_name,
                });
            }

            inputs.push(upstream);
        }

        let previous = std::mem::replace(&mut self.nodes[downstream.0].inputs, inputs);
        if let Err(e) = self.validate_dependents(downstream) {
            self.nodes[downstream.0].inputs = previous;
            return Err(e);
        }

        let node = &self.nodes[downstream.0];
        info!(
            network = down_name.as_str(), inputs = node.inputs.len();
            "attached input networks, input shape {}",
            node.model.in_dim()
        );

        Ok(())
    }

    /// Validates `id` and every model it feeds, directly or not.
    fn validate_dependents(&self, id: ModelId) -> Result<()> {
        for current in self.ids() {
            if self.reachable(current)?.contains(&id) {
                self.validate(current)?;
            }
        }

        Ok(())
    }

    /// Checks that the concatenated outputs of `inputs` match the input shape of `id`.
    fn check_inputs(&self, id: ModelId, inputs: &[ModelId]) -> Result<()> {
        let model = self.get(id)?;
        let expected = model.in_dim();

        let mismatch = |got: Vec<usize>| MlErr::ShapeMismatch {
            network: model.name().to_string(),
            got,
            expected: expected.dims(),
        };

        let mut channels = 0;
        for &input in inputs {
            let out_dim = self.get(input)?.out_dim();

            let fits = out_dim.is_spatial()
                && std::mem::discriminant(&out_dim) == std::mem::discriminant(&expected)
                && out_dim.spatial() == expected.spatial();

            if !fits {
                return Err(mismatch(out_dim.dims()));
            }

            channels += out_dim.channels();
        }

        if !inputs.is_empty() && channels != expected.channels() {
            let got = expected
                .resized(channels, expected.spatial())
                .map(|shape| shape.dims())
                .unwrap_or_default();
            return Err(mismatch(got));
        }

        Ok(())
    }

    /// Returns `id` and every model reachable from it through input networks.
    fn reachable(&self, id: ModelId) -> Result<Vec<ModelId>> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }

            order.push(current);
            stack.extend(self.node(current)?.inputs.iter().rev());
        }

        Ok(order)
    }

    /// Returns the models at the start of the graph feeding `id`, those without input networks.
    fn sources(&self, id: ModelId) -> Result<Vec<ModelId>> {
        let mut sources = Vec::new();

        for current in self.reachable(id)? {
            if self.node(current)?.inputs.is_empty() {
                sources.push(current);
            }
        }

        Ok(sources)
    }

    /// Validates the shapes of `id` and everything reachable upstream.
    ///
    /// Every model's input networks have to match its input shape, and every source model
    /// has to take the same input shape since they all receive the same batches.
    pub fn validate(&self, id: ModelId) -> Result<()> {
        for current in self.reachable(id)? {
            let node = self.node(current)?;
            if !node.inputs.is_empty() {
                self.check_inputs(current, &node.inputs)?;
            }
        }

        self.input_shape(id).map(|_| ())
    }

    /// Returns the sample shape the batches of a forward pass through `id` must have.
    pub fn input_shape(&self, id: ModelId) -> Result<Shape> {
        let sources = self.sources(id)?;
        let Some((&first, rest)) = sources.split_first() else {
            return Err(MlErr::UnknownModel(id.0));
        };
        let first = self.get(first)?.in_dim();

        for &source in rest {
            let in_dim = self.get(source)?.in_dim();

            if in_dim != first {
                return Err(MlErr::ShapeMismatch {
                    network: self.get(source)?.name().to_string(),
                    got: in_dim.dims(),
                    expected: first.dims(),
                });
            }
        }

        Ok(first)
    }

    /// Sets every parameter of `id` as not trainable.
    ///
    /// # Arguments
    /// * `id` - The model to freeze.
    /// * `apply_inputs` - Whether to also freeze every model reachable through input networks.
    pub fn freeze(&mut self, id: ModelId, apply_inputs: bool) -> Result<()> {
        self.set_trainable(id, false, apply_inputs)
    }

    /// Sets every parameter of `id` as trainable, the inverse of `freeze`.
    pub fn unfreeze(&mut self, id: ModelId, apply_inputs: bool) -> Result<()> {
        self.set_trainable(id, true, apply_inputs)
    }

    fn set_trainable(&mut self, id: ModelId, trainable: bool, apply_inputs: bool) -> Result<()> {
        let targets = if apply_inputs {
            self.reachable(id)?
        } else {
            self.node(id)?;
            vec![id]
        };

        for target in &targets {
            self.nodes[target.0].model.set_trainable(trainable);
        }

        debug!(trainable = trainable, models = targets.len(); "updated trainable flags");
        Ok(())
    }

    /// Runs every batch through `id`, its input networks first.
    ///
    /// # Arguments
    /// * `id` - The model to evaluate.
    /// * `batches` - Batches shaped `(batch, *input_shape(id))`, each one is fed to every
    ///   source model.
    /// * `convert_to_class` - Whether to return the index of the highest score of each sample
    ///   instead of the scores, only valid for models with a classification layer.
    ///
    /// # Returns
    /// The outputs of every batch concatenated along the batch axis.
    pub fn forward_pass<'a, I>(
        &self,
        id: ModelId,
        batches: I,
        convert_to_class: bool,
    ) -> Result<Prediction>
    where
        I: IntoIterator<Item = ArrayViewD<'a, f32>>,
    {
        self.validate(id)?;
        let model = self.get(id)?;

        if convert_to_class && model.num_classes().is_none() {
            return Err(MlErr::NoClassifier(model.name().to_string()));
        }

        let outputs = batches
            .into_iter()
            .map(|x| self.forward(id, x, &mut HashMap::new()))
            .collect::<Result<Vec<_>>>()?;

        let views: Vec<_> = outputs.iter().map(|y| y.view()).collect();
        let scores = match views.as_slice() {
            [] => ArrayD::zeros(model.out_dim().batched(0)),
            views => concatenate(Axis(0), views)?,
        };

        if convert_to_class {
            let scores = scores.into_dimensionality::<Ix2>()?;
            return Ok(Prediction::Classes(metrics::get_class(scores.view())));
        }

        Ok(Prediction::Scores(scores))
    }

    fn forward(
        &self,
        id: ModelId,
        x: ArrayViewD<f32>,
        cache: &mut HashMap<ModelId, ArrayD<f32>>,
    ) -> Result<ArrayD<f32>> {
        if let Some(y) = cache.get(&id) {
            return Ok(y.clone());
        }

        let node = self.node(id)?;
        let y = if node.inputs.is_empty() {
            node.model.forward(x)?
        } else {
            let outputs = node
                .inputs
                .iter()
                .map(|&input| self.forward(input, x.view(), cache))
                .collect::<Result<Vec<_>>>()?;
            let views: Vec<_> = outputs.iter().map(|y| y.view()).collect();
            let merged = concatenate(Axis(1), views.as_slice())?;

            node.model.forward(merged.view())?
        };

        cache.insert(id, y.clone());
        Ok(y)
    }
}

#[cfg(test)]
mod tests {
    use model_specs::{ConvNetSpec, ConvUnitSpec};

    use super::*;

    fn same(name: &str, in_channels: usize) -> ConvNet {
        let unit = ConvUnitSpec::new(in_channels, 1, 3).with_padding(1);
        let spec = ConvNetSpec::new(name, vec![in_channels, 4, 4], vec![unit]).with_seed(5);
        ConvNet::from_spec(&spec).unwrap()
    }

    #[test]
    fn forward_concatenates_inputs_and_batches() {
        let mut graph = ModelGraph::new();
        let left = graph.insert(same("left", 1)).unwrap();
        let right = graph.insert(same("right", 1)).unwrap();
        let merge = graph.insert(same("merge", 2)).unwrap();
        graph.add_input_networks(merge, &[left, right]).unwrap();

        let x = ArrayD::ones(vec![2, 1, 4, 4]);
        let y = ArrayD::zeros(vec![1, 1, 4, 4]);
        let output = graph.forward_pass(merge, [x.view(), y.view()], false).unwrap();

        assert_eq!(output.scores().unwrap().shape(), &[3, 1, 4, 4]);
    }

    #[test]
    fn debug_lists_models() {
        let mut graph = ModelGraph::new();
        graph.insert(same("lonely", 1)).unwrap();

        let debug = format!("{graph:?}");

        assert!(debug.contains("lonely"));
        assert!(matches!(
            ModelGraph::from_json("{}").unwrap_err(),
            MlErr::InvalidConfig(_)
        ));
    }
}
