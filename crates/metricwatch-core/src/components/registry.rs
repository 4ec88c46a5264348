//! Registry resolving configured type names to component factories
//!
//! Built-in variants are listed in [`ComponentRegistry::builtin`]. Code
//! outside this crate adds its own through [`ComponentRegistry::register_variant`]
//! or, for fully qualified identifiers that should not show up among the
//! variant names, [`ComponentRegistry::register_extension`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::aggregation::{
    Aggregation, Aggregations, AvgAggregation, CountAggregation, LastAggregation,
    MaxAggregation, MinAggregation, SumAggregation,
};
use crate::analysis::{Analyses, Analysis, FixedThresholdAnalysis, RecentAnalysis};
use crate::error::{Error, Result};
use crate::notificator::{ConstantNotificator, Notificator, Notificators, PercentageNotificator};
use crate::properties::{Properties, TYPE_KEY};

use super::{Capability, Component, ComponentKind};

/// Creates a fresh, unconfigured instance
pub type Factory<C> = Arc<dyn Fn() -> Result<Box<C>> + Send + Sync>;

/// What happens when a name is registered twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationMode {
    /// The last registration wins
    #[default]
    Override,
    /// A second registration is refused
    Strict,
}

/// Factories of one capability
pub struct TypeTable<C: ?Sized> {
    kind: ComponentKind,
    variants: BTreeMap<String, Factory<C>>,
    extensions: BTreeMap<String, Factory<C>>,
}

impl<C: ?Sized> TypeTable<C> {
    fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            variants: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Registered variant names, sorted
    pub fn names(&self) -> Vec<String> {
        self.variants.keys().cloned().collect()
    }

    /// Registered extension identifiers, sorted
    pub fn extension_identifiers(&self) -> Vec<String> {
        self.extensions.keys().cloned().collect()
    }

    fn insert(
        kind: ComponentKind,
        map: &mut BTreeMap<String, Factory<C>>,
        name: String,
        factory: Factory<C>,
        mode: RegistrationMode,
    ) -> Result<()> {
        if mode == RegistrationMode::Strict && map.contains_key(&name) {
            return Err(Error::DuplicateRegistration { kind, name });
        }

        if map.insert(name.clone(), factory).is_some() {
            debug!(kind = %kind, name = %name, "Component registration overridden");
        }
        Ok(())
    }

    /// Variants first, then extensions
    fn resolve(&self, type_name: &str) -> Result<&Factory<C>> {
        self.variants
            .get(type_name)
            .or_else(|| self.extensions.get(type_name))
            .ok_or_else(|| Error::UnknownType {
                kind: self.kind,
                type_name: type_name.to_string(),
                available: self.names(),
            })
    }
}

impl<C: ?Sized> fmt::Debug for TypeTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeTable")
            .field("kind", &self.kind)
            .field("variants", &self.variants.keys().collect::<Vec<_>>())
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Factory of every configurable component
#[derive(Debug)]
pub struct ComponentRegistry {
    mode: RegistrationMode,
    analyses: TypeTable<dyn Analysis>,
    aggregations: TypeTable<dyn Aggregation>,
    notificators: TypeTable<dyn Notificator>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ComponentRegistry {
    /// Create a registry without any registration
    pub fn new(mode: RegistrationMode) -> Self {
        Self {
            mode,
            analyses: TypeTable::new(ComponentKind::Analysis),
            aggregations: TypeTable::new(ComponentKind::Aggregation),
            notificators: TypeTable::new(ComponentKind::Notificator),
        }
    }

    /// Registry holding every built-in variant, later registrations override
    pub fn builtin() -> Self {
        Self::builtin_with_mode(RegistrationMode::Override)
    }

    /// Registry holding every built-in variant
    pub fn builtin_with_mode(mode: RegistrationMode) -> Self {
        let mut registry = Self::new(mode);
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        // names are unique within each table, the calls below cannot fail
        let _ = self.register_variant::<Analyses, _>("fixed-threshold", || {
            Ok(Box::new(FixedThresholdAnalysis::default()) as Box<dyn Analysis>)
        });
        let _ = self.register_variant::<Analyses, _>("recent", || {
            Ok(Box::new(RecentAnalysis::default()) as Box<dyn Analysis>)
        });

        let _ = self.register_variant::<Aggregations, _>("sum", || {
            Ok(Box::new(SumAggregation) as Box<dyn Aggregation>)
        });
        let _ = self.register_variant::<Aggregations, _>("count", || {
            Ok(Box::new(CountAggregation) as Box<dyn Aggregation>)
        });
        let _ = self.register_variant::<Aggregations, _>("avg", || {
            Ok(Box::new(AvgAggregation) as Box<dyn Aggregation>)
        });
        let _ = self.register_variant::<Aggregations, _>("max", || {
            Ok(Box::new(MaxAggregation) as Box<dyn Aggregation>)
        });
        let _ = self.register_variant::<Aggregations, _>("min", || {
            Ok(Box::new(MinAggregation) as Box<dyn Aggregation>)
        });
        let _ = self.register_variant::<Aggregations, _>("last", || {
            Ok(Box::new(LastAggregation) as Box<dyn Aggregation>)
        });

        let _ = self.register_variant::<Notificators, _>("constant", || {
            Ok(Box::new(ConstantNotificator::default()) as Box<dyn Notificator>)
        });
        let _ = self.register_variant::<Notificators, _>("percentage", || {
            Ok(Box::new(PercentageNotificator::default()) as Box<dyn Notificator>)
        });
    }

    /// How duplicate names are handled
    pub fn mode(&self) -> RegistrationMode {
        self.mode
    }

    /// Register a named variant of capability `C`
    pub fn register_variant<C, F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        C: Capability,
        F: Fn() -> Result<Box<C::Component>> + Send + Sync + 'static,
    {
        let mode = self.mode;
        let factory: Factory<C::Component> = Arc::new(factory);
        let table = C::table_mut(self);
        TypeTable::insert(C::KIND, &mut table.variants, name.into(), factory, mode)
    }

    /// Register an extension of capability `C` under a fully qualified identifier
    ///
    /// Extensions are only looked up when no variant carries the configured name.
    pub fn register_extension<C, F>(&mut self, identifier: impl Into<String>, factory: F) -> Result<()>
    where
        C: Capability,
        F: Fn() -> Result<Box<C::Component>> + Send + Sync + 'static,
    {
        let mode = self.mode;
        let factory: Factory<C::Component> = Arc::new(factory);
        let table = C::table_mut(self);
        TypeTable::insert(C::KIND, &mut table.extensions, identifier.into(), factory, mode)
    }

    /// Registered variant names of capability `C`
    pub fn available<C: Capability>(&self) -> Vec<String> {
        C::table(self).names()
    }

    /// Build and configure the component named by the `type` property
    pub fn build<C: Capability>(&self, properties: &Properties) -> Result<Box<C::Component>> {
        self.instantiate::<C>(None, properties)
    }

    /// Like [`ComponentRegistry::build`], assigning `id` before configuration
    pub fn build_with_id<C: Capability>(
        &self,
        id: &str,
        properties: &Properties,
    ) -> Result<Box<C::Component>> {
        self.instantiate::<C>(Some(id), properties)
    }

    /// Build the component if properties are given and define a `type`
    pub fn build_optional<C: Capability>(
        &self,
        properties: Option<&Properties>,
    ) -> Result<Option<Box<C::Component>>> {
        match properties {
            Some(props) if props.is_type_defined() => self.build::<C>(props).map(Some),
            _ => Ok(None),
        }
    }

    fn instantiate<C: Capability>(
        &self,
        id: Option<&str>,
        properties: &Properties,
    ) -> Result<Box<C::Component>> {
        let type_name = properties
            .get_property(TYPE_KEY)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::configuration(format!("{}: component type cannot be null", C::KIND))
            })?;

        let factory = C::table(self).resolve(type_name)?;
        let mut component =
            factory().map_err(|e| Error::construction(C::KIND, type_name, e))?;

        if let Some(id) = id {
            component.set_id(id);
        }
        component.configure(properties)?;

        debug!(kind = %C::KIND, type_name, id, "Component built");
        Ok(component)
    }
}

impl Capability for Analyses {
    type Component = dyn Analysis;
    const KIND: ComponentKind = ComponentKind::Analysis;

    fn table(registry: &ComponentRegistry) -> &TypeTable<dyn Analysis> {
        &registry.analyses
    }

    fn table_mut(registry: &mut ComponentRegistry) -> &mut TypeTable<dyn Analysis> {
        &mut registry.analyses
    }
}

impl Capability for Aggregations {
    type Component = dyn Aggregation;
    const KIND: ComponentKind = ComponentKind::Aggregation;

    fn table(registry: &ComponentRegistry) -> &TypeTable<dyn Aggregation> {
        &registry.aggregations
    }

    fn table_mut(registry: &mut ComponentRegistry) -> &mut TypeTable<dyn Aggregation> {
        &mut registry.aggregations
    }
}

impl Capability for Notificators {
    type Component = dyn Notificator;
    const KIND: ComponentKind = ComponentKind::Notificator;

    fn table(registry: &ComponentRegistry) -> &TypeTable<dyn Notificator> {
        &registry.notificators
    }

    fn table_mut(registry: &mut ComponentRegistry) -> &mut TypeTable<dyn Notificator> {
        &mut registry.notificators
    }
}
