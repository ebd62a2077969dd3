//! Generated call adapters between the runtime and native callables.
//!
//! The runtime only knows how to call "a native function taking the VM":
//! [`ForeignMethodFn`]. For every bound callable this module stamps out one
//! such function, monomorphized on the callable's type, which
//!
//! 1. for methods, unwraps and type-checks the receiver in slot 0,
//! 2. reads parameter `i` from slot `i + 1`,
//! 3. invokes the callable,
//! 4. writes the result to slot 0 unless it is `()`.
//!
//! Because the adapter has no data pointer of its own, the callable must be
//! zero-sized: a `fn` item or a closure that captures nothing. This is
//! checked at compile time.
//!
//! # Example
//!
//! ```ignore
//! fn distance(a: &Point, b: Point) -> f64 { ... }
//!
//! let adapter: ForeignMethodFn<WrenVM> = method_adapter::<WrenVM, Point, _, _>(distance);
//! let getter = getter_adapter::<WrenVM, Point, f64, _>(|p: &mut Point| &mut p.x);
//! ```

use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::ffi::convert::{FieldSlot, FromSlot, IntoSlot};
use crate::ffi::foreign::{emplace_in_receiver, finalize, get_slot_foreign};
use crate::ffi::registry::ClassMethods;
use crate::runtime::Runtime;

/// Native entry point of a foreign method.
///
/// The receiver is in slot 0, arguments follow; the result goes to slot 0.
/// The C ABI does not unwind: a panic inside a bound callable aborts.
pub type ForeignMethodFn<R> = unsafe extern "C" fn(vm: *mut R);

/// Destructor for the raw storage of a foreign object.
pub type FinalizeFn = unsafe extern "C" fn(data: *mut c_void);

/// Shape marker: free function, every parameter comes from a slot.
pub struct Free<Args>(PhantomData<Args>);

/// Shape marker: method taking the receiver by shared reference.
pub struct Ref<Args>(PhantomData<Args>);

/// Shape marker: method taking the receiver by mutable reference.
pub struct Mut<Args>(PhantomData<Args>);

/// A native callable bound as a foreign method of class `T`.
///
/// Implemented for closures and `fn` items of up to eight parameters (plus
/// the receiver). `Marker` records the shape and is inferred.
pub trait ForeignFn<R: Runtime, T, Marker>: Copy + 'static {
    fn invoke(self, vm: &mut R);
}

/// Builds a `T` from constructor arguments in slots 1 and up.
pub trait Constructor<R: Runtime, T, Args>: Copy + 'static {
    fn construct(self, vm: &mut R) -> T;
}

/// Arguments pushed by [`Method::call`](crate::core::method::Method::call).
///
/// Implemented for tuples of up to eight [`IntoSlot`] values; element `i`
/// goes to slot `i + 1`.
pub trait CallArgs<R: Runtime> {
    const ARITY: usize;

    fn push(self, vm: &mut R);
}

macro_rules! impl_adapters {
    ($arity:literal; $($arg:ident $val:ident $idx:literal),*) => {
        impl<R, T, F, Ret, $($arg,)*> ForeignFn<R, T, Free<($($arg,)*)>> for F
        where
            R: Runtime,
            F: Fn($($arg),*) -> Ret + Copy + 'static,
            Ret: IntoSlot<R>,
            $($arg: FromSlot<R>,)*
        {
            #[inline]
            fn invoke(self, vm: &mut R) {
                $(let $val = <$arg as FromSlot<R>>::from_slot(vm, $idx + 1);)*
                let ret = (self)($($val),*);
                ret.into_slot(vm, 0);
            }
        }

        impl<R, T, F, Ret, $($arg,)*> ForeignFn<R, T, Ref<($($arg,)*)>> for F
        where
            R: Runtime,
            T: 'static,
            F: Fn(&T, $($arg),*) -> Ret + Copy + 'static,
            Ret: IntoSlot<R>,
            $($arg: FromSlot<R>,)*
        {
            #[inline]
            fn invoke(self, vm: &mut R) {
                let this = get_slot_foreign::<R, T>(vm, 0);
                $(let $val = <$arg as FromSlot<R>>::from_slot(vm, $idx + 1);)*
                let ret = (self)(unsafe { this.as_ref() }, $($val),*);
                ret.into_slot(vm, 0);
            }
        }

        impl<R, T, F, Ret, $($arg,)*> ForeignFn<R, T, Mut<($($arg,)*)>> for F
        where
            R: Runtime,
            T: 'static,
            F: Fn(&mut T, $($arg),*) -> Ret + Copy + 'static,
            Ret: IntoSlot<R>,
            $($arg: FromSlot<R>,)*
        {
            #[inline]
            fn invoke(self, vm: &mut R) {
                let mut this = get_slot_foreign::<R, T>(vm, 0);
                $(let $val = <$arg as FromSlot<R>>::from_slot(vm, $idx + 1);)*
                let ret = (self)(unsafe { this.as_mut() }, $($val),*);
                ret.into_slot(vm, 0);
            }
        }

        impl<R, T, F, $($arg,)*> Constructor<R, T, ($($arg,)*)> for F
        where
            R: Runtime,
            F: Fn($($arg),*) -> T + Copy + 'static,
            $($arg: FromSlot<R>,)*
        {
            #[inline]
            fn construct(self, vm: &mut R) -> T {
                $(let $val = <$arg as FromSlot<R>>::from_slot(vm, $idx + 1);)*
                (self)($($val),*)
            }
        }

        impl<R, $($arg,)*> CallArgs<R> for ($($arg,)*)
        where
            R: Runtime,
            $($arg: IntoSlot<R>,)*
        {
            const ARITY: usize = $arity;

            #[inline]
            #[allow(unused_variables)]
            fn push(self, vm: &mut R) {
                let ($($val,)*) = self;
                $($val.into_slot(vm, $idx + 1);)*
            }
        }
    };
}

impl_adapters!(0;);
impl_adapters!(1; A0 a0 0);
impl_adapters!(2; A0 a0 0, A1 a1 1);
impl_adapters!(3; A0 a0 0, A1 a1 1, A2 a2 2);
impl_adapters!(4; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3);
impl_adapters!(5; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4);
impl_adapters!(6; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5);
impl_adapters!(7; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5, A6 a6 6);
impl_adapters!(8; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5, A6 a6 6, A7 a7 7);

// ============================================================================
// Adapter generation
// ============================================================================

/// Produces a value of a zero-sized callable type.
///
/// # Safety
///
/// `F` must be zero-sized and have no validity invariant beyond that, which
/// holds for `fn` items and closures without captures.
#[inline(always)]
unsafe fn conjure<F>() -> F {
    const { assert!(mem::size_of::<F>() == 0) };
    unsafe { NonNull::<F>::dangling().as_ptr().read() }
}

#[inline(always)]
fn assert_zero_sized<F>(f: F) {
    const {
        assert!(
            mem::size_of::<F>() == 0,
            "bound callables must be fn items or closures without captures"
        )
    };
    mem::forget(f);
}

unsafe extern "C" fn call_method<R, T, M, F>(vm: *mut R)
where
    R: Runtime,
    F: ForeignFn<R, T, M>,
{
    let f = unsafe { conjure::<F>() };
    f.invoke(unsafe { &mut *vm });
}

unsafe extern "C" fn call_getter<R, T, U, F>(vm: *mut R)
where
    R: Runtime,
    T: 'static,
    U: FieldSlot<R>,
    F: Fn(&mut T) -> &mut U + Copy + 'static,
{
    let f = unsafe { conjure::<F>() };
    let vm = unsafe { &mut *vm };
    let mut this = get_slot_foreign::<R, T>(vm, 0);
    let field = f(unsafe { this.as_mut() });
    U::field_into_slot(field, vm, 0);
}

unsafe extern "C" fn call_setter<R, T, U, F>(vm: *mut R)
where
    R: Runtime,
    T: 'static,
    U: FromSlot<R>,
    F: Fn(&mut T) -> &mut U + Copy + 'static,
{
    let f = unsafe { conjure::<F>() };
    let vm = unsafe { &mut *vm };
    let mut this = get_slot_foreign::<R, T>(vm, 0);
    let value = U::from_slot(vm, 1);
    *f(unsafe { this.as_mut() }) = value;
}

unsafe extern "C" fn call_allocate<R, T, A, C>(vm: *mut R)
where
    R: Runtime,
    T: 'static,
    C: Constructor<R, T, A>,
{
    let ctor = unsafe { conjure::<C>() };
    let vm = unsafe { &mut *vm };
    let value = ctor.construct(vm);
    emplace_in_receiver(vm, value);
}

/// Adapter for a free function or a method of `T`.
pub fn method_adapter<R, T, M, F>(f: F) -> ForeignMethodFn<R>
where
    R: Runtime,
    F: ForeignFn<R, T, M>,
{
    assert_zero_sized(f);
    call_method::<R, T, M, F>
}

/// Adapter writing the projected field of the receiver to slot 0.
pub fn getter_adapter<R, T, U, F>(f: F) -> ForeignMethodFn<R>
where
    R: Runtime,
    T: 'static,
    U: FieldSlot<R>,
    F: Fn(&mut T) -> &mut U + Copy + 'static,
{
    assert_zero_sized(f);
    call_getter::<R, T, U, F>
}

/// Adapter assigning slot 1 to the projected field of the receiver.
pub fn setter_adapter<R, T, U, F>(f: F) -> ForeignMethodFn<R>
where
    R: Runtime,
    T: 'static,
    U: FromSlot<R>,
    F: Fn(&mut T) -> &mut U + Copy + 'static,
{
    assert_zero_sized(f);
    call_setter::<R, T, U, F>
}

/// Allocate/finalize pair constructing an owned `T` with `ctor`.
pub fn class_methods<R, T, A, C>(ctor: C) -> ClassMethods<R>
where
    R: Runtime,
    T: 'static,
    C: Constructor<R, T, A>,
{
    assert_zero_sized(ctor);
    ClassMethods {
        allocate: Some(call_allocate::<R, T, A, C>),
        finalize: Some(finalize::<T>),
    }
}
